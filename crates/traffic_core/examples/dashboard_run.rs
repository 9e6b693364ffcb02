//! Drive all three panels for one simulated minute and print what the dashboard would show.
//!
//! Run with: cargo run -p traffic_core --example dashboard_run

use traffic_core::{ControlCommand, EngineConfig, ForecastWindow, Generator, TrafficEngine};

fn main() {
    const SIMULATION_MS: u64 = 60_000;
    const SEED: u64 = 123;

    let mut engine = match TrafficEngine::new(EngineConfig::default().with_seed(SEED)) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };
    engine.start();
    let steps = engine.advance_by(SIMULATION_MS / 2);
    engine.apply(ControlCommand::Reset(Generator::Vehicles));
    let steps = steps + engine.advance_by(SIMULATION_MS / 2);
    engine.apply(ControlCommand::Regenerate(ForecastWindow::Short));

    let snapshot = engine.snapshot();
    println!("--- Dashboard run (seed {SEED}, {} s simulated) ---", SIMULATION_MS / 1000);
    println!("Events processed: {steps}");
    println!(
        "Vehicle ticks: {}  spawned: {}  retired: {}  rejected spawns: {}",
        snapshot.flow.ticks, snapshot.flow.spawned, snapshot.flow.retired, snapshot.flow.rejected_spawns
    );

    println!("\nLanes:");
    let lanes = engine.config().vehicles.lane_count;
    for lane in 0..lanes {
        let mut positions: Vec<String> = snapshot
            .vehicles
            .in_lane(lane)
            .map(|v| format!("{:?}@{:.1}", v.class, v.position))
            .collect();
        if positions.is_empty() {
            positions.push("(empty)".to_string());
        }
        println!("  lane {lane}: {}", positions.join(", "));
    }

    println!("\nCongestion grid (pass {}):", snapshot.grid.pass);
    for row in snapshot.grid.grid.rows() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>4.0}")).collect();
        println!("  {}", cells.join(""));
    }

    if let Some(series) = snapshot.forecast {
        println!("\nForecast ({}):", series.window);
        for point in &series.points {
            let marker = if point.is_forecast { "*" } else { " " };
            println!("  {marker} {:>6}  {:>5.1}", point.label, point.value);
        }
    }
}
