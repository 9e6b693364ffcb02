pub mod grid_perturb;
pub mod vehicle_tick;
