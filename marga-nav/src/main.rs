//! MargaNav - Corridor wall-following controller
//!
//! Runs the control loop against the simulated board:
//!
//! - **Simulation threads**: car kinematics and scripted switch presses
//! - **Main thread**: the control loop at the configured tick rate
//!
//! Ctrl-C stops the loop cooperatively; the throttle is neutral on exit.
//!
//! ```bash
//! RUST_LOG=debug marga-nav --config marga.toml
//! ```

use clap::Parser;
use marga_nav::telemetry::SampleRing;
use marga_nav::{ControlLoop, Drivers, NavConfig, Result, ShutdownSignal, inbox};
use parking_lot::Mutex;
use setu_io::ButtonSource;
use setu_io::devices::mock::CorridorSimulator;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Corridor wall-following controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to marga.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Press SW2 after this many seconds (overrides the config)
    #[arg(long)]
    stop_after: Option<f64>,

    /// Simulation noise seed (overrides the config)
    #[arg(long)]
    seed: Option<u64>,
}

fn load_config(args: &Args) -> Result<NavConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from {:?}", path);
            NavConfig::load(path)?
        }
        None if Path::new("marga.toml").exists() => {
            log::info!("Loading configuration from marga.toml");
            NavConfig::load(Path::new("marga.toml"))?
        }
        None => {
            log::info!("Using default configuration");
            NavConfig::default()
        }
    };

    if let Some(secs) = args.stop_after {
        config.simulation.buttons.stop_after_secs = secs;
    }
    if let Some(seed) = args.seed {
        config.simulation.random_seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("MargaNav v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&args)?;

    let shutdown = ShutdownSignal::new();
    let handler_signal = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        handler_signal.request();
    })
    .map_err(|e| marga_nav::NavError::Config(format!("Failed to set Ctrl-C handler: {}", e)))?;

    let mut simulator = CorridorSimulator::start(config.simulation.clone(), config.channels)?;

    let (button_tx, button_inbox) = inbox();
    simulator.buttons().subscribe(button_tx)?;

    let samples = Arc::new(Mutex::new(SampleRing::new(config.telemetry.capacity)));
    let drivers = Drivers {
        analog: Box::new(simulator.analog()),
        actuators: Box::new(simulator.servos()),
        indicators: Box::new(simulator.indicators()),
    };
    let mut control = ControlLoop::new(config, drivers, button_inbox, shutdown)?
        .with_sample_sink(Arc::clone(&samples));

    let result = control.run();

    let pose = simulator.pose();
    let ring = samples.lock();
    log::info!(
        "Travelled {:.0}cm, final offset {:+.1}cm, heading {:+.1}°, {} wall contacts",
        pose.travelled_cm,
        pose.lateral_cm,
        pose.heading_rad.to_degrees(),
        simulator.wall_contacts()
    );
    if let Some(last) = ring.latest() {
        log::info!(
            "Recorded {} offset samples ({} overwritten), last {:+.1}cm at {}ms",
            ring.len(),
            ring.overwritten(),
            last.value,
            last.timestamp_ms
        );
    }
    drop(ring);

    simulator.stop();
    result.map(|_| ())
}
