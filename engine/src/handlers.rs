//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: execute one full daily run through the orchestrator
//! - preflight: lightweight entrypoint that validates the setup and
//!   writes a run-timestamped stub summary
//! - doctor: diagnostics for configuration, credentials, and output paths

use anyhow::{Context, Result};
use serde_json::json;

use crate::config::Config;
use crate::platforms::{build_adapters, credential_env_vars, credentials_present};
use crate::scheduler::Orchestrator;
use crate::summary::RunSummary;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Execute one full daily run
///
/// Builds one adapter per enabled platform, hands them to the
/// orchestrator, and reports the summary artifact path. Completed runs
/// always exit 0: connect failures, empty discoveries, and deadline
/// cutoffs are all recorded in the summary, not surfaced as process
/// failures.
pub async fn handle_run(
    mut config: Config,
    format: OutputFormat,
    dry_run: bool,
    auto: bool,
) -> Result<()> {
    // CLI flags override the configured run mode for this invocation only.
    if dry_run {
        config.runtime.dry_run = true;
    }
    if auto {
        config.runtime.assist_mode = false;
    }

    let adapters = build_adapters(&config);

    if let OutputFormat::Text = format {
        println!(
            "Starting daily run ({} platform(s) enabled, dry_run={}, assist_mode={})",
            adapters.len(),
            config.runtime.dry_run,
            config.runtime.assist_mode
        );
        println!();
    }

    let orchestrator = Orchestrator::new(config, adapters);
    let path = orchestrator
        .run_daily()
        .await
        .context("Failed to write run summary")?;

    match format {
        OutputFormat::Text => {
            println!("✓ Daily run completed");
            println!("  Summary: {}", path.display());
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "completed",
                "summary_path": path,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Lightweight preflight entrypoint
///
/// Reports which platforms are enabled and whether their credentials are
/// present (never reading the values), writes a run-timestamped summary
/// artifact, and exits 0 even with zero platforms configured.
pub async fn handle_preflight(config: &Config, format: OutputFormat) -> Result<()> {
    let enabled = config.enabled_platforms();
    let mut summary = RunSummary::new();

    if enabled.is_empty() {
        summary.add_reasoning("No platforms configured; nothing to do.");
    }

    let mut platform_reports = Vec::new();
    for name in &enabled {
        let present = credentials_present(name);
        summary.add_reasoning(format!(
            "{}: enabled, credentials {}.",
            name,
            if present { "present" } else { "missing" }
        ));
        platform_reports.push(json!({
            "platform": name,
            "credentials_present": present,
        }));
    }

    summary.set_summary(format!("Preflight: {} platform(s) enabled.", enabled.len()));
    let path = summary
        .write_timestamped(&config.logging.export_daily_json)
        .context("Failed to write preflight summary")?;

    match format {
        OutputFormat::Text => {
            if enabled.is_empty() {
                println!("No platforms configured.");
            }
            for report in &platform_reports {
                println!(
                    "  {:<14} credentials {}",
                    report["platform"].as_str().unwrap_or("?"),
                    if report["credentials_present"].as_bool().unwrap_or(false) {
                        "present"
                    } else {
                        "MISSING"
                    }
                );
            }
            println!("Wrote summary: {}", path.display());
        }
        OutputFormat::Json => {
            let output = json!({
                "platforms_enabled": enabled.len(),
                "per_platform": platform_reports,
                "summary_path": path,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Run system diagnostics
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Check 1: Configuration validation
    // Config is already validated when loaded
    checks.push(("Configuration".to_string(), "Valid".to_string()));

    // Check 2: Platforms and credentials
    let enabled = config.enabled_platforms();
    if enabled.is_empty() {
        checks.push(("Platforms".to_string(), "None enabled".to_string()));
        issues.push("No platforms enabled. Enable at least one in config.toml.".to_string());
    }

    for (name, platform) in config.platform_entries() {
        if !platform.enabled {
            checks.push((format!("Platform {}", name), "Disabled".to_string()));
            continue;
        }

        checks.push((format!("Platform {}", name), "Enabled".to_string()));

        if credentials_present(name) {
            checks.push((format!("{} credentials", name), "Present".to_string()));
        } else {
            checks.push((format!("{} credentials", name), "Missing".to_string()));
            issues.push(format!(
                "Missing credentials for {}. Set {}.",
                name,
                credential_env_vars(name).join(" / ")
            ));
        }
    }

    // Check 3: Summary export directory
    let export_dir = &config.logging.export_daily_json;
    match std::fs::create_dir_all(export_dir) {
        Ok(()) => checks.push(("Export directory".to_string(), "Writable".to_string())),
        Err(e) => {
            checks.push(("Export directory".to_string(), "Not writable".to_string()));
            issues.push(format!(
                "Cannot create export directory {}: {}",
                export_dir.display(),
                e
            ));
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Gleaner diagnostics:");
            for (check, status) in &checks {
                println!("  {:<24} {}", check, status);
            }
            if issues.is_empty() {
                println!();
                println!("✓ All checks passed");
            } else {
                println!();
                println!("Issues found:");
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks
                    .iter()
                    .map(|(check, status)| json!({ "check": check, "status": status }))
                    .collect::<Vec<_>>(),
                "issues": issues,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
