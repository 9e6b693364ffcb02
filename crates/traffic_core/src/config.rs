//! Engine configuration.
//!
//! Supplied once at construction and immutable afterwards. Every struct uses
//! `#[serde(default)]` so a JSON file only needs the fields it overrides.

use std::path::Path;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::forecast::ForecastWindow;
use crate::patterns::DiurnalProfile;
use crate::vehicles::VehicleClass;

/// Offsets added to the engine seed so generators draw independent streams.
const VEHICLE_SEED_OFFSET: u64 = 0;
const GRID_SEED_OFFSET: u64 = 0x9E37_79B9;
const FORECAST_SEED_OFFSET: u64 = 0x85EB_CA6B;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleFlowConfig {
    pub lane_count: usize,
    pub tick_period_ms: u64,
    /// Delay between a reset and the first tick of the new cycle.
    pub reset_grace_ms: u64,
    /// Chance per tick of attempting one spawn.
    pub spawn_probability: f64,
    /// Fraction of `speed` applied as position delta per tick.
    pub step_factor: f64,
    /// Position new vehicles start at, before the visible lane start.
    pub entry_position: f64,
    /// A spawn is rejected while any vehicle in the lane is below this position.
    pub entry_gap: f64,
    pub speeds: Vec<f64>,
    pub widths: Vec<f64>,
    pub classes: Vec<VehicleClass>,
}

impl Default for VehicleFlowConfig {
    fn default() -> Self {
        Self {
            lane_count: 4,
            tick_period_ms: 100,
            reset_grace_ms: 100,
            spawn_probability: 0.3,
            step_factor: 0.25,
            entry_position: -5.0,
            entry_gap: 10.0,
            speeds: vec![2.0, 3.0, 4.0],
            widths: vec![20.0, 24.0, 30.0],
            classes: vec![
                VehicleClass::Car,
                VehicleClass::Bus,
                VehicleClass::Truck,
                VehicleClass::Motorcycle,
            ],
        }
    }
}

impl VehicleFlowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count == 0 {
            return Err(ConfigError::invalid("vehicles.lane_count", "must be at least 1"));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::invalid("vehicles.tick_period_ms", "must be positive"));
        }
        check_probability("vehicles.spawn_probability", self.spawn_probability)?;
        if !(self.step_factor.is_finite() && self.step_factor > 0.0) {
            return Err(ConfigError::invalid("vehicles.step_factor", "must be positive"));
        }
        if self.speeds.is_empty() || self.speeds.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ConfigError::invalid(
                "vehicles.speeds",
                "must be a non-empty list of positive values",
            ));
        }
        if self.widths.is_empty() || self.widths.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
            return Err(ConfigError::invalid(
                "vehicles.widths",
                "must be a non-empty list of positive values",
            ));
        }
        if self.classes.is_empty() {
            return Err(ConfigError::invalid("vehicles.classes", "must not be empty"));
        }
        Ok(())
    }
}

/// Cell that receives a fixed congestion bonus at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub row: usize,
    pub col: usize,
    pub bonus: f64,
}

impl Hotspot {
    pub const fn new(row: usize, col: usize, bonus: f64) -> Self {
        Self { row, col, bonus }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongestionGridConfig {
    pub size: usize,
    pub perturb_period_ms: u64,
    pub reset_grace_ms: u64,
    /// Value at the grid center before bonuses.
    pub center_value: f64,
    /// Value lost per unit of distance from the center.
    pub distance_decay: f64,
    pub hotspots: Vec<Hotspot>,
    /// Bonus on the central row and column.
    pub arterial_bonus: f64,
    pub perturb_cells: usize,
    pub perturb_delta: f64,
}

impl Default for CongestionGridConfig {
    fn default() -> Self {
        Self {
            size: 10,
            perturb_period_ms: 2000,
            reset_grace_ms: 100,
            center_value: 100.0,
            distance_decay: 15.0,
            hotspots: vec![
                Hotspot::new(2, 3, 30.0),
                Hotspot::new(7, 6, 25.0),
                Hotspot::new(3, 8, 20.0),
                Hotspot::new(8, 2, 15.0),
            ],
            arterial_bonus: 10.0,
            perturb_cells: 5,
            perturb_delta: 10.0,
        }
    }
}

impl CongestionGridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::invalid("grid.size", "must be at least 1"));
        }
        if self.perturb_period_ms == 0 {
            return Err(ConfigError::invalid("grid.perturb_period_ms", "must be positive"));
        }
        for (field, value) in [
            ("grid.center_value", self.center_value),
            ("grid.distance_decay", self.distance_decay),
            ("grid.arterial_bonus", self.arterial_bonus),
            ("grid.perturb_delta", self.perturb_delta),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, "must be finite"));
            }
        }
        if let Some(h) = self.hotspots.iter().find(|h| !h.bonus.is_finite()) {
            return Err(ConfigError::invalid(
                "grid.hotspots",
                format!("bonus at ({}, {}) must be finite", h.row, h.col),
            ));
        }
        Ok(())
    }
}

/// Shape of the extrapolated segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Trend magnitude far from any peak.
    pub base_step: f64,
    /// Extra magnitude as the next peak approaches (scaled by proximity 0..1).
    pub peak_weight: f64,
    /// Probability of an upward step while heading toward a peak.
    pub upward_bias: f64,
    /// Probability of an upward step while already inside a peak.
    pub in_peak_upward_bias: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            base_step: 2.0,
            peak_weight: 6.0,
            upward_bias: 0.65,
            in_peak_upward_bias: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub default_window: ForecastWindow,
    pub base_level: f64,
    /// Half-width of the symmetric uniform noise on observed points.
    pub noise: f64,
    /// Local time offset used to evaluate time-of-day windows.
    pub utc_offset_minutes: i32,
    pub profile: DiurnalProfile,
    pub trend: TrendConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_window: ForecastWindow::Medium,
            base_level: 40.0,
            noise: 5.0,
            utc_offset_minutes: 0,
            profile: DiurnalProfile::default(),
            trend: TrendConfig::default(),
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(ConfigError::invalid("forecast.noise", "must be >= 0"));
        }
        if !self.base_level.is_finite() {
            return Err(ConfigError::invalid("forecast.base_level", "must be finite"));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::invalid(
                "forecast.utc_offset_minutes",
                "must be within one day",
            ));
        }
        check_probability("forecast.trend.upward_bias", self.trend.upward_bias)?;
        check_probability(
            "forecast.trend.in_peak_upward_bias",
            self.trend.in_peak_upward_bias,
        )?;
        let windows = self
            .profile
            .peaks
            .iter()
            .chain(&self.profile.moderate)
            .chain(&self.profile.quiet);
        for w in windows {
            if w.start >= 24 || w.end > 24 {
                return Err(ConfigError::invalid(
                    "forecast.profile",
                    format!("hour window {}..{} is outside 0..24", w.start, w.end),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for every generator; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Wall-clock Unix ms at simulated time 0; `None` uses the current time.
    pub epoch_ms: Option<i64>,
    pub vehicles: VehicleFlowConfig,
    pub grid: CongestionGridConfig,
    pub forecast: ForecastConfig,
}

impl EngineConfig {
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vehicles.validate()?;
        self.grid.validate()?;
        self.forecast.validate()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_epoch_ms(mut self, epoch_ms: i64) -> Self {
        self.epoch_ms = Some(epoch_ms);
        self
    }

    pub fn vehicle_seed(&self) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(VEHICLE_SEED_OFFSET))
    }

    pub fn grid_seed(&self) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(GRID_SEED_OFFSET))
    }

    pub fn forecast_seed(&self) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(FORECAST_SEED_OFFSET))
    }
}

/// Probability safe to hand to `gen_bool`; non-finite values never fire.
pub(crate) fn usable_probability(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not within 0..=1")))
    }
}
