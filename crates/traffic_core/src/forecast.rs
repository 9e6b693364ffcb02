//! Observed-plus-forecast congestion series.
//!
//! A series is rebuilt from scratch on every request: an observed prefix
//! walking back from `now` with a diurnal shape, followed by a fixed number
//! of extrapolated points trending toward (or away from) the next peak.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use chrono::{DateTime, Duration, FixedOffset, Offset, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{usable_probability, ForecastConfig};
use crate::error::InvalidWindowError;
use crate::grid::clamp_congestion;

/// Number of extrapolated points appended to every series.
pub const FORECAST_HORIZON: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastWindow {
    /// Last hour at 5-minute resolution.
    Short,
    /// Last day, hourly.
    Medium,
    /// Last week, daily.
    Long,
}

impl ForecastWindow {
    pub const ALL: [ForecastWindow; 3] = [Self::Short, Self::Medium, Self::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            ForecastWindow::Short => "short",
            ForecastWindow::Medium => "medium",
            ForecastWindow::Long => "long",
        }
    }

    pub fn observed_points(self) -> usize {
        match self {
            ForecastWindow::Short => 12,
            ForecastWindow::Medium => 24,
            ForecastWindow::Long => 7,
        }
    }

    pub fn total_points(self) -> usize {
        self.observed_points() + FORECAST_HORIZON
    }

    pub fn step(self) -> Duration {
        match self {
            ForecastWindow::Short => Duration::minutes(5),
            ForecastWindow::Medium => Duration::hours(1),
            ForecastWindow::Long => Duration::days(1),
        }
    }

    fn label_format(self) -> &'static str {
        match self {
            ForecastWindow::Short => "%H:%M",
            ForecastWindow::Medium => "%a %H:00",
            ForecastWindow::Long => "%b %d",
        }
    }
}

impl fmt::Display for ForecastWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastWindow {
    type Err = InvalidWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" | "1h" => Ok(ForecastWindow::Short),
            "medium" | "24h" => Ok(ForecastWindow::Medium),
            "long" | "7d" => Ok(ForecastWindow::Long),
            _ => Err(InvalidWindowError {
                requested: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub label: String,
    pub timestamp_ms: i64,
    pub value: f64,
    pub is_forecast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    pub window: ForecastWindow,
    pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Index of the first forecast point.
    pub fn split_index(&self) -> usize {
        self.points
            .iter()
            .position(|p| p.is_forecast)
            .unwrap_or(self.points.len())
    }

    pub fn observed(&self) -> &[ForecastPoint] {
        &self.points[..self.split_index()]
    }

    pub fn forecast(&self) -> &[ForecastPoint] {
        &self.points[self.split_index()..]
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.label.as_str())
    }
}

#[derive(Resource)]
pub struct ForecastGenerator {
    config: ForecastConfig,
    rng: StdRng,
    series: Option<Arc<ForecastSeries>>,
}

impl ForecastGenerator {
    pub fn new(config: ForecastConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            series: None,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn series(&self) -> Option<Arc<ForecastSeries>> {
        self.series.clone()
    }

    /// Parses `name` before touching state, so a bad name keeps the prior series.
    pub fn regenerate_named(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<ForecastSeries>, InvalidWindowError> {
        let window = name.parse::<ForecastWindow>()?;
        Ok(self.regenerate(window, now))
    }

    pub fn regenerate(&mut self, window: ForecastWindow, now: DateTime<Utc>) -> Arc<ForecastSeries> {
        let offset =
            FixedOffset::east_opt(self.config.utc_offset_minutes * 60).unwrap_or(Utc.fix());
        let local_now = now.with_timezone(&offset);
        let step = window.step();
        let mut points = Vec::with_capacity(window.total_points());

        let observed = window.observed_points();
        for back in (0..observed).rev() {
            let at = local_now - step * back as i32;
            let value = self.observed_value(&at);
            points.push(point(window, &at, value, false));
        }

        let mut previous = points.last().map(|p| p.value).unwrap_or(self.config.base_level);
        for ahead in 1..=FORECAST_HORIZON {
            let at = local_now + step * ahead as i32;
            previous = clamp_congestion(previous + self.trend_step(&at));
            points.push(point(window, &at, previous, true));
        }

        let series = Arc::new(ForecastSeries { window, points });
        debug!(%window, points = series.points.len(), "forecast regenerated");
        self.series = Some(Arc::clone(&series));
        series
    }

    fn observed_value(&mut self, at: &DateTime<FixedOffset>) -> f64 {
        let noise = if self.config.noise.is_finite() && self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..=self.config.noise)
        } else {
            0.0
        };
        clamp_congestion(self.config.base_level + self.config.profile.bias_at(hour_of(at)) + noise)
    }

    /// Signed step whose size grows as the next peak gets closer.
    fn trend_step(&mut self, at: &DateTime<FixedOffset>) -> f64 {
        let hour = hour_of(at);
        let profile = &self.config.profile;
        let trend = &self.config.trend;
        let proximity = profile
            .hours_to_next_peak(hour)
            .map(|hours| 1.0 - (hours / 24.0).min(1.0))
            .unwrap_or(0.0);
        let magnitude = trend.base_step + trend.peak_weight * proximity;
        let up_probability = if profile.in_peak(hour) {
            trend.in_peak_upward_bias
        } else {
            trend.upward_bias
        };
        if self.rng.gen_bool(usable_probability(up_probability)) {
            magnitude
        } else {
            -magnitude
        }
    }
}

fn hour_of(at: &DateTime<FixedOffset>) -> f64 {
    f64::from(at.hour()) + f64::from(at.minute()) / 60.0
}

fn point(window: ForecastWindow, at: &DateTime<FixedOffset>, value: f64, is_forecast: bool) -> ForecastPoint {
    ForecastPoint {
        label: at.format(window.label_format()).to_string(),
        timestamp_ms: at.timestamp_millis(),
        value,
        is_forecast,
    }
}
