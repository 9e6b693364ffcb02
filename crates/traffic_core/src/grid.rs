//! Spatial congestion field.
//!
//! The field is built once from a distance-decay formula plus fixed bonuses,
//! then drifts through small random perturbations. Every write goes through
//! [clamp_congestion], so no cell ever leaves `[0, 100]`.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::trace;

use crate::clock::EventKind;
use crate::config::CongestionGridConfig;
use crate::timer::TickTimer;

pub const MIN_CONGESTION: f64 = 0.0;
pub const MAX_CONGESTION: f64 = 100.0;

pub fn clamp_congestion(value: f64) -> f64 {
    value.clamp(MIN_CONGESTION, MAX_CONGESTION)
}

/// Square matrix stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionGrid {
    size: usize,
    cells: Vec<f64>,
}

impl CongestionGrid {
    /// Deterministic initial field for `config`.
    pub fn generate(config: &CongestionGridConfig) -> Self {
        let size = config.size;
        let center = size as f64 / 2.0;
        let arterial = size / 2;
        let mut cells = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                let dr = row as f64 - center;
                let dc = col as f64 - center;
                let distance = (dr * dr + dc * dc).sqrt();
                let mut value = config.center_value - distance * config.distance_decay;
                value += config
                    .hotspots
                    .iter()
                    .filter(|h| h.row == row && h.col == col)
                    .map(|h| h.bonus)
                    .sum::<f64>();
                if row == arterial || col == arterial {
                    value += config.arterial_bonus;
                }
                cells.push(clamp_congestion(value));
            }
        }
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(row * self.size + col).copied()
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        let idx = row * self.size + col;
        self.cells[idx] = clamp_congestion(value);
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.cells.chunks(self.size.max(1))
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn mean(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().sum::<f64>() / self.cells.len() as f64
    }

    /// Most congested cell as `(row, col, value)`; first one wins on ties.
    pub fn max_cell(&self) -> Option<(usize, usize, f64)> {
        self.cells
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (idx, &value)| match best {
                Some((_, best_value)) if best_value >= value => best,
                _ => Some((idx, value)),
            })
            .map(|(idx, value)| (idx / self.size, idx % self.size, value))
    }
}

/// One cell touched by a perturbation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellChange {
    pub row: usize,
    pub col: usize,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerturbReport {
    pub changes: Vec<CellChange>,
}

/// Immutable view of the grid after a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridFrame {
    pub pass: u64,
    pub grid: CongestionGrid,
}

#[derive(Resource)]
pub struct CongestionGridEngine {
    config: CongestionGridConfig,
    rng: StdRng,
    grid: CongestionGrid,
    passes: u64,
    timer: TickTimer,
    published: Arc<GridFrame>,
}

impl CongestionGridEngine {
    pub fn new(config: CongestionGridConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let timer = TickTimer::new(
            EventKind::GridPerturb,
            EventKind::GridResume,
            config.perturb_period_ms,
            config.reset_grace_ms,
        );
        let grid = CongestionGrid::generate(&config);
        let published = Arc::new(GridFrame {
            pass: 0,
            grid: grid.clone(),
        });
        Self {
            config,
            rng,
            grid,
            passes: 0,
            timer,
            published,
        }
    }

    pub fn config(&self) -> &CongestionGridConfig {
        &self.config
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut TickTimer {
        &mut self.timer
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Rebuilds the field from the formula and publishes it.
    pub fn initialize(&mut self) {
        self.grid = CongestionGrid::generate(&self.config);
        self.passes = 0;
        self.publish();
    }

    /// One drift pass: a handful of random cells each move up or down by the delta.
    pub fn perturb(&mut self) -> PerturbReport {
        let size = self.config.size;
        let mut report = PerturbReport::default();
        if size == 0 {
            return report;
        }
        for _ in 0..self.config.perturb_cells {
            let row = self.rng.gen_range(0..size);
            let col = self.rng.gen_range(0..size);
            let delta = if self.rng.gen_bool(0.5) {
                self.config.perturb_delta
            } else {
                -self.config.perturb_delta
            };
            let before = self.grid.get(row, col).unwrap_or_default();
            self.grid.set(row, col, before + delta);
            let after = self.grid.get(row, col).unwrap_or_default();
            report.changes.push(CellChange {
                row,
                col,
                before,
                after,
            });
        }
        self.passes += 1;
        self.publish();
        trace!(pass = self.passes, touched = report.changes.len(), "grid perturbed");
        report
    }

    pub fn current_grid(&self) -> Arc<GridFrame> {
        Arc::clone(&self.published)
    }

    fn publish(&mut self) {
        self.published = Arc::new(GridFrame {
            pass: self.passes,
            grid: self.grid.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Hotspot;

    fn plain_config(size: usize) -> CongestionGridConfig {
        CongestionGridConfig {
            size,
            hotspots: Vec::new(),
            arterial_bonus: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn value_decays_with_distance_from_center() {
        let grid = CongestionGrid::generate(&plain_config(10));
        let center = grid.get(5, 5).expect("center");
        let near = grid.get(5, 6).expect("near");
        let corner = grid.get(0, 0).expect("corner");
        assert_eq!(center, 100.0);
        assert_eq!(near, 85.0);
        assert_eq!(corner, 0.0);
    }

    #[test]
    fn hotspot_and_arterial_bonuses_apply() {
        let mut config = plain_config(10);
        config.hotspots = vec![Hotspot::new(1, 1, 40.0), Hotspot::new(99, 99, 50.0)];
        config.arterial_bonus = 10.0;
        let base = CongestionGrid::generate(&plain_config(10));
        let grid = CongestionGrid::generate(&config);

        // (1,1): distance ~5.66 → 15.15 before bonus.
        let expected = clamp_congestion(base.get(1, 1).expect("cell") + 40.0);
        assert!((grid.get(1, 1).expect("cell") - expected).abs() < 1e-9);
        // (5,2) lies on the central row.
        assert!((grid.get(5, 2).expect("cell") - (base.get(5, 2).expect("cell") + 10.0)).abs() < 1e-9);
        // Off-arterial, non-hotspot cells are unchanged.
        assert_eq!(grid.get(3, 3), base.get(3, 3));
    }

    #[test]
    fn perturb_touches_at_most_configured_cells() {
        let mut engine = CongestionGridEngine::new(CongestionGridConfig::default(), Some(9));
        let before = engine.current_grid();
        let report = engine.perturb();
        assert_eq!(report.changes.len(), 5);
        let after = engine.current_grid();

        let touched: Vec<_> = report.changes.iter().map(|c| (c.row, c.col)).collect();
        let mut differing = 0;
        for row in 0..10 {
            for col in 0..10 {
                if before.grid.get(row, col) != after.grid.get(row, col) {
                    differing += 1;
                    assert!(touched.contains(&(row, col)));
                }
            }
        }
        assert!(differing <= 5);
        assert_eq!(after.pass, 1);
    }

    #[test]
    fn values_stay_clamped_under_long_drift() {
        let mut engine = CongestionGridEngine::new(CongestionGridConfig::default(), Some(3));
        for _ in 0..2_000 {
            engine.perturb();
        }
        assert!(engine
            .current_grid()
            .grid
            .cells()
            .iter()
            .all(|v| (MIN_CONGESTION..=MAX_CONGESTION).contains(v)));
    }

    #[test]
    fn initialize_restores_formula_field() {
        let config = CongestionGridConfig::default();
        let mut engine = CongestionGridEngine::new(config.clone(), Some(5));
        for _ in 0..20 {
            engine.perturb();
        }
        engine.initialize();
        assert_eq!(engine.current_grid().grid, CongestionGrid::generate(&config));
        assert_eq!(engine.passes(), 0);
    }

    #[test]
    fn max_cell_reports_first_peak() {
        let grid = CongestionGrid::generate(&CongestionGridConfig::default());
        let (row, col, value) = grid.max_cell().expect("non-empty");
        assert_eq!(value, 100.0);
        assert_eq!(grid.get(row, col), Some(100.0));
    }
}
