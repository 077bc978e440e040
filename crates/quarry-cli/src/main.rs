#![doc = include_str!("../README.md")]

mod collector;

use clap::Parser;
use collector::commands;
use collector::config::{CliArgs, CollectorConfig};
use collector::telemetry::init_telemetry;

// Using mimalloc for steadier allocation behavior across musl and glibc
// builds.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CollectorConfig::try_from(args)?;

    init_telemetry(config.log_level)?;
    log_startup_info(&config);

    let stdout = std::io::stdout();
    commands::run(&config, &mut stdout.lock())
}

fn log_startup_info(config: &CollectorConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {:#?}", config);
    } else {
        tracing::debug!(
            "Starting with windows from {} and data in {}",
            config.windows_path.display(),
            config.data_dir.display()
        );
    }
}
