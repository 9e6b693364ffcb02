use std::path::PathBuf;

use thiserror::Error;

/// Requested forecast window is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown forecast window '{requested}' (expected short, medium or long)")]
pub struct InvalidWindowError {
    pub requested: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
