// Gleaner annotation automation engine
// Main entry point for the gleaner binary

use clap::Parser;
use gleaner_engine::cli::{Cli, Command};
use gleaner_engine::config::Config;
use gleaner_engine::handlers::{handle_doctor, handle_preflight, handle_run, OutputFormat};
use gleaner_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    tracing::info!("Gleaner v{}", env!("CARGO_PKG_VERSION"));

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided). A failure here
    // is the only path that exits non-zero: the state machine has not
    // started yet.
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with the CLI-or-config-driven log level
    // (only takes effect if RUST_LOG env var is not set)
    let log_level = cli.log.as_deref().unwrap_or(&config.logging.log_level);
    init_telemetry_with_level(log_level);

    // Handle commands
    match cli.command {
        Command::Run { dry_run, auto } => {
            tracing::info!("Starting daily run...");
            handle_run(config, format, dry_run, auto).await
        }

        Command::Preflight => {
            tracing::info!("Running preflight...");
            handle_preflight(&config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
