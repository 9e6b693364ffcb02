//! Time-of-day congestion bias used by the forecast generator.
//!
//! Windows are half-open hour ranges `[start, end)` on a 24h clock and may wrap
//! past midnight (`22..5`). Defaults follow typical commuter rush hours.

use serde::{Deserialize, Serialize};

const HOURS_PER_DAY: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether fractional `hour` (0.0..24.0) falls inside the window.
    pub fn contains(&self, hour: f64) -> bool {
        let start = f64::from(self.start);
        let end = f64::from(self.end);
        if self.start <= self.end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    }

    /// Hours from `hour` until this window next opens (0 when inside it).
    pub fn hours_until(&self, hour: f64) -> f64 {
        if self.contains(hour) {
            return 0.0;
        }
        (f64::from(self.start) - hour).rem_euclid(HOURS_PER_DAY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiurnalProfile {
    /// Rush-hour windows.
    pub peaks: Vec<HourWindow>,
    pub peak_bonus: f64,
    /// Busy-but-not-rush windows.
    pub moderate: Vec<HourWindow>,
    pub moderate_bonus: f64,
    /// Overnight lull.
    pub quiet: Vec<HourWindow>,
    pub quiet_penalty: f64,
}

impl Default for DiurnalProfile {
    fn default() -> Self {
        Self {
            peaks: vec![HourWindow::new(7, 9), HourWindow::new(16, 19)],
            peak_bonus: 35.0,
            moderate: vec![HourWindow::new(10, 16)],
            moderate_bonus: 15.0,
            quiet: vec![HourWindow::new(22, 5)],
            quiet_penalty: 15.0,
        }
    }
}

impl DiurnalProfile {
    /// Profile with no time-of-day effect.
    pub fn flat() -> Self {
        Self {
            peaks: Vec::new(),
            peak_bonus: 0.0,
            moderate: Vec::new(),
            moderate_bonus: 0.0,
            quiet: Vec::new(),
            quiet_penalty: 0.0,
        }
    }

    pub fn in_peak(&self, hour: f64) -> bool {
        self.peaks.iter().any(|w| w.contains(hour))
    }

    /// Additive bias for `hour`. Peak wins over moderate, moderate over quiet.
    pub fn bias_at(&self, hour: f64) -> f64 {
        if self.in_peak(hour) {
            self.peak_bonus
        } else if self.moderate.iter().any(|w| w.contains(hour)) {
            self.moderate_bonus
        } else if self.quiet.iter().any(|w| w.contains(hour)) {
            -self.quiet_penalty
        } else {
            0.0
        }
    }

    /// Hours until the nearest peak opens; `None` when no peaks are configured.
    pub fn hours_to_next_peak(&self, hour: f64) -> Option<f64> {
        self.peaks
            .iter()
            .map(|w| w.hours_until(hour))
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_window_spans_midnight() {
        let night = HourWindow::new(22, 5);
        assert!(night.contains(23.5));
        assert!(night.contains(0.0));
        assert!(night.contains(4.9));
        assert!(!night.contains(5.0));
        assert!(!night.contains(12.0));
    }

    #[test]
    fn default_profile_biases() {
        let p = DiurnalProfile::default();
        assert_eq!(p.bias_at(8.0), 35.0);
        assert_eq!(p.bias_at(17.5), 35.0);
        assert_eq!(p.bias_at(12.0), 15.0);
        assert_eq!(p.bias_at(3.0), -15.0);
        assert_eq!(p.bias_at(20.0), 0.0);
    }

    #[test]
    fn hours_to_next_peak_wraps() {
        let p = DiurnalProfile::default();
        assert_eq!(p.hours_to_next_peak(8.0), Some(0.0));
        assert_eq!(p.hours_to_next_peak(6.0), Some(1.0));
        assert_eq!(p.hours_to_next_peak(12.0), Some(4.0));
        assert_eq!(p.hours_to_next_peak(20.0), Some(11.0));
        assert_eq!(DiurnalProfile::flat().hours_to_next_peak(8.0), None);
    }
}
