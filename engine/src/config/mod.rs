//! Configuration management
//!
//! This module handles loading, validation, and management of the Gleaner
//! configuration. Configuration is stored in TOML format at
//! ~/.gleaner/config.toml and is loaded exactly once per run; nothing
//! mutates it afterwards.
//!
//! # Configuration Sections
//!
//! - **runtime**: daily time budget, pacing bounds, dry-run and assist flags
//! - **platforms**: one block per platform (enabled, base_url, headless, daily_cap)
//! - **strategy**: worklist selection knobs
//! - **logging**: summary export directory and log level
//!
//! Platform blocks that are missing from the file are treated as disabled.
//!
//! # Path Expansion
//!
//! The configuration system expands a leading ~ in the export directory to
//! the user's home directory and creates the directory on first write.
//!
//! # Examples
//!
//! ```no_run
//! use gleaner_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Dry run: {}", config.runtime.dry_run);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Represents the complete Gleaner configuration loaded from
/// ~/.gleaner/config.toml. Every section has sensible defaults, so an
/// empty file is a valid (all-platforms-disabled) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Run-level settings
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Per-platform adapter settings
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// Worklist selection settings
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Summary export and log settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Run-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Wall-clock ceiling for one run, in hours
    #[serde(default = "default_max_daily_hours")]
    pub max_daily_hours: f64,

    /// [min, max] pacing delay before each unit of work, in milliseconds
    #[serde(default = "default_human_delay_ms")]
    pub human_delay_ms: [u64; 2],

    /// When set, never contact adapters during execution
    #[serde(default)]
    pub dry_run: bool,

    /// When set, compute annotations but never commit them
    #[serde(default = "default_true")]
    pub assist_mode: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_daily_hours: default_max_daily_hours(),
            human_delay_ms: default_human_delay_ms(),
            dry_run: false,
            assist_mode: true,
        }
    }
}

/// The set of known platform blocks
///
/// Unknown platform names in the TOML are ignored by serde; a missing
/// block deserializes to a disabled default.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlatformsConfig {
    /// Appen portal (browser session)
    #[serde(default)]
    pub appen: PlatformConfig,

    /// Toloka portal (browser session)
    #[serde(default)]
    pub toloka: PlatformConfig,

    /// Label Studio instance (REST API)
    #[serde(default)]
    pub labelstudio: PlatformConfig,
}

/// Settings for one platform adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Whether this platform participates in the run
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the platform portal or API
    #[serde(default)]
    pub base_url: String,

    /// Run the browser headless (browser-session platforms only)
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Per-run sample cap; defaults to 100 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_cap: Option<u32>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            headless: true,
            daily_cap: None,
        }
    }
}

/// Worklist selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// After projects, append a few qualifications to keep steady progress
    #[serde(default = "default_true")]
    pub fallback_to_qualifications: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fallback_to_qualifications: true,
        }
    }
}

/// Summary export and logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory the JSON run summaries are written to (supports ~ expansion)
    #[serde(default = "default_export_dir")]
    pub export_daily_json: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            export_daily_json: default_export_dir(),
            log_level: default_log_level(),
        }
    }
}

// Default value functions
fn default_max_daily_hours() -> f64 {
    4.0
}

fn default_human_delay_ms() -> [u64; 2] {
    [300, 1800]
}

fn default_true() -> bool {
    true
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("daily_summaries")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default location (~/.gleaner/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration (all platforms disabled). Validates the configuration
    /// after loading and returns descriptive errors if validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails, or
    /// validation fails. This is the only failure that exits non-zero.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.gleaner/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".gleaner").join("config.toml"))
    }

    /// Validate the configuration and normalize paths
    ///
    /// Checks value ranges and that every enabled platform carries the
    /// settings its adapter needs; expands ~ in the export directory.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        if self.runtime.max_daily_hours <= 0.0 {
            return Err(EngineError::Config(
                "runtime.max_daily_hours must be positive".to_string(),
            ));
        }

        let [lo, hi] = self.runtime.human_delay_ms;
        if lo > hi {
            return Err(EngineError::Config(format!(
                "runtime.human_delay_ms bounds are inverted: [{}, {}]",
                lo, hi
            )));
        }

        for (name, platform) in self.platform_entries() {
            if platform.enabled && platform.base_url.is_empty() {
                return Err(EngineError::Config(format!(
                    "platforms.{}.base_url is required when the platform is enabled",
                    name
                )));
            }
        }

        self.logging.export_daily_json = expand_tilde(&self.logging.export_daily_json)?;

        Ok(())
    }

    /// Iterate the known platform blocks with their names
    pub fn platform_entries(&self) -> Vec<(&'static str, &PlatformConfig)> {
        vec![
            ("appen", &self.platforms.appen),
            ("toloka", &self.platforms.toloka),
            ("labelstudio", &self.platforms.labelstudio),
        ]
    }

    /// Names of the platforms enabled for this run, in fixed order
    pub fn enabled_platforms(&self) -> Vec<&'static str> {
        self.platform_entries()
            .into_iter()
            .filter(|(_, p)| p.enabled)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Expand a leading ~ to the user's home directory
fn expand_tilde(path: &Path) -> Result<PathBuf, EngineError> {
    let Some(s) = path.to_str() else {
        return Ok(path.to_path_buf());
    };

    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(rest))
    } else {
        Ok(path.to_path_buf())
    }
}
