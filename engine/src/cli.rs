//! CLI interface for Gleaner
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for controlling daily runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gleaner annotation automation engine
///
/// Coordinates automated work on annotation platforms within a bounded
/// daily time and volume budget, and writes an auditable run summary.
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute one full daily run
    Run {
        /// Never contact platforms; count attempts only
        #[arg(long)]
        dry_run: bool,

        /// Commit annotations instead of pre-filling (disables assist mode)
        #[arg(long)]
        auto: bool,
    },

    /// Check configuration and credentials, write a stub summary, exit 0
    Preflight,

    /// Run system diagnostics
    Doctor,
}
