pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod grid;
pub mod patterns;
pub mod runner;
pub mod systems;
pub mod timer;
pub mod vehicles;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::EngineConfig;
pub use engine::{ControlCommand, EngineSnapshot, Generator, TrafficEngine};
pub use error::{ConfigError, InvalidWindowError};
pub use forecast::ForecastWindow;
