use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use traffic_core::clock::EventKind;
use traffic_core::vehicles::VehicleFlow;
use traffic_core::{
    ConfigError, ControlCommand, EngineConfig, EngineSnapshot, ForecastWindow,
    InvalidWindowError, TrafficEngine,
};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "traffic_demo",
    about = "Headless driver for the synthetic traffic dashboard engine",
    long_about = "Runs the vehicle flow, congestion grid and forecast generators for a\n\
                  simulated duration and prints the frames a dashboard would render."
)]
struct Cli {
    /// JSON engine configuration; missing fields fall back to defaults
    #[arg(long, env = "TRAFFIC_CONFIG")]
    config: Option<PathBuf>,
    /// Seed overriding the config file
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated time to run, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    duration_ms: u64,
    /// Forecast window: short, medium or long
    #[arg(long, default_value = "medium")]
    window: String,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Print a vehicle frame every N ticks (0 prints only the final state)
    #[arg(long, default_value_t = 0)]
    every: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Window(#[from] InvalidWindowError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Report<'a> {
    window: ForecastWindow,
    events: usize,
    snapshot: &'a EngineSnapshot,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DemoError> {
    let window = cli.window.parse::<ForecastWindow>()?;

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    config.forecast.default_window = window;

    let mut engine = TrafficEngine::new(config)?;
    engine.start();
    engine.apply(ControlCommand::Regenerate(window));
    info!(duration_ms = cli.duration_ms, %window, "running");

    let format = cli.format;
    let every = cli.every;
    let events = engine.advance_by_with_hook(cli.duration_ms, |world, event| {
        if every == 0 || event.kind != EventKind::VehicleTick {
            return;
        }
        let frame = world.resource::<VehicleFlow>().snapshot();
        if frame.tick % every != 0 {
            return;
        }
        match format {
            OutputFormat::Text => println!(
                "t={:>7}ms tick={:>5} vehicles={:>3} visible={:>3}",
                event.timestamp,
                frame.tick,
                frame.len(),
                frame.visible().count()
            ),
            OutputFormat::Json => match serde_json::to_string(&*frame) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("failed to encode frame: {e}"),
            },
        }
    });

    let snapshot = engine.snapshot();
    match format {
        OutputFormat::Text => print_text(&snapshot, events),
        OutputFormat::Json => {
            let report = Report {
                window,
                events,
                snapshot: &snapshot,
            };
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
        }
    }
    Ok(())
}

fn print_text(snapshot: &EngineSnapshot, events: usize) {
    println!("--- {} ms simulated, {} events ---", snapshot.now_ms, events);
    println!(
        "vehicles: {} active ({} visible) | ticks {} spawned {} retired {} rejected {}",
        snapshot.vehicles.len(),
        snapshot.vehicles.visible().count(),
        snapshot.flow.ticks,
        snapshot.flow.spawned,
        snapshot.flow.retired,
        snapshot.flow.rejected_spawns
    );
    let grid = &snapshot.grid.grid;
    match grid.max_cell() {
        Some((row, col, value)) => println!(
            "grid: pass {} mean {:.1} hottest ({row},{col}) = {value:.0}",
            snapshot.grid.pass,
            grid.mean()
        ),
        None => println!("grid: empty"),
    }
    if let Some(series) = &snapshot.forecast {
        let observed: Vec<String> = series
            .observed()
            .iter()
            .map(|p| format!("{}={:.0}", p.label, p.value))
            .collect();
        let forecast: Vec<String> = series
            .forecast()
            .iter()
            .map(|p| format!("{}={:.0}", p.label, p.value))
            .collect();
        println!("forecast ({}): {}", series.window, observed.join(" "));
        println!("  next: {}", forecast.join(" "));
    }
}
