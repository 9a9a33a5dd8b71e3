//! # RTC Manager Binary
//!
//! Hosts the built-in component modules on a periodic execution context.
//!
//! # Usage
//!
//! ```bash
//! # Run the Robot Controller standalone at the default rate
//! rtcd
//!
//! # Run from a manager configuration
//! rtcd --config config/rtc.toml
//!
//! # Override the rate and stop after 1000 cycles
//! rtcd --rate 100 --cycles 1000 -v
//!
//! # Inspect modules
//! rtcd --list
//! rtcd --print-profile RobotControllerTest
//! ```

use clap::Parser;
use rtc_common::config::{ComponentConfig, ConfigLoader, LogLevel, ManagerConfig};
use rtc_common::consts::DEFAULT_CONFIG_SET;
use rtc_manager::{Manager, register_all_components};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// RTC Manager - periodic host for component modules
#[derive(Parser, Debug)]
#[command(name = "rtcd")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Component manager with periodic execution context")]
#[command(long_about = None)]
struct Args {
    /// Path to manager configuration (rtc.toml).
    /// Without it a single RobotControllerTest instance is created.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the execution rate in Hz
    #[arg(short, long)]
    rate: Option<f64>,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// List registered modules and exit
    #[arg(long)]
    list: bool,

    /// Print a module profile as JSON and exit
    #[arg(long, value_name = "IMPLEMENTATION_ID")]
    print_profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Manager failed: {}", e);
        eprintln!("rtcd: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ManagerConfig::load(path)?,
        None => standalone_config(),
    };
    if let Some(rate) = args.rate {
        config.exec_cxt.rate = rate;
    }

    setup_tracing(&args, config.shared.log_level);
    info!("RTC Manager v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut manager = Manager::new(config)?;
    register_all_components(&mut manager)?;

    if args.list {
        for id in manager.registry().list() {
            println!("{id}");
        }
        return Ok(());
    }

    if let Some(id) = &args.print_profile {
        let profile = manager
            .registry()
            .profile(id)
            .ok_or_else(|| format!("module not found: {id}"))?;
        println!("{}", serde_json::to_string_pretty(profile.as_ref())?);
        return Ok(());
    }

    let created = manager.apply_config()?;
    info!("Created components: {:?}", created);

    let running = manager.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    manager.start()?;
    if let Err(e) = manager.run(args.cycles) {
        error!("Execution loop error: {}", e);
    }
    manager.shutdown()?;

    info!("RTC Manager shutdown complete");
    Ok(())
}

/// Configuration used without `--config`: one activated Robot Controller.
fn standalone_config() -> ManagerConfig {
    ManagerConfig {
        components: vec![ComponentConfig {
            implementation_id: "RobotControllerTest".to_string(),
            activate: true,
            active_set: DEFAULT_CONFIG_SET.to_string(),
            conf: BTreeMap::new(),
        }],
        ..ManagerConfig::default()
    }
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        "debug"
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
