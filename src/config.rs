//! Configuration system for wcdump.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **Config file** - `--config FILE`, else `~/.config/wcdump/config.toml`
//! 3. **Environment variables** - `WCDUMP_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [window]
//! timezone = "Asia/Jerusalem"
//!
//! [decode]
//! outgoing_flag = 1
//! binary_bodies = "placeholder"
//!
//! [output]
//! path = "dump.json"
//! pretty = true
//! colors = true
//!
//! [scan]
//! parallel = true
//! ```

use crate::assembler::ScanOptions;
use crate::decoder::BinaryBodyMode;
use crate::error::{Result, WcError};
use crate::extractor::ExtractOptions;
use crate::schema;
use crate::window::DEFAULT_TIME_ZONE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default JSON output file.
pub const DEFAULT_OUTPUT: &str = "dump.json";

/// Main configuration structure for wcdump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time window interpretation.
    pub window: WindowConfig,
    /// Message decoding.
    pub decode: DecodeConfig,
    /// Output formatting configuration.
    pub output: OutputConfig,
    /// Backup scanning.
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// IANA zone used to read `--from-date` / `--to-date`.
    /// Environment variable: `WCDUMP_TZ`
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// `Des` value of messages sent by the account owner.
    /// Environment variable: `WCDUMP_OUTGOING_FLAG`
    pub outgoing_flag: i64,

    /// Rendering of image/voice/video/app bodies: `placeholder` or `hex`.
    /// Environment variable: `WCDUMP_BINARY_BODIES`
    pub binary_bodies: BinaryBodyMode,
}

/// Output formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default JSON output path (`-` for stdout).
    /// Environment variable: `WCDUMP_OUTPUT`
    pub path: Option<PathBuf>,

    /// Pretty-print JSON.
    pub pretty: bool,

    /// Enable colored output.
    pub colors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Assemble accounts in parallel.
    /// Environment variable: `WCDUMP_PARALLEL`
    pub parallel: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIME_ZONE.to_string(),
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            outgoing_flag: schema::DEFAULT_OUTGOING_FLAG,
            binary_bodies: BinaryBodyMode::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            pretty: true,
            colors: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// An explicit `path` must exist and parse; the default user file is
    /// skipped with a warning when broken.
    ///
    /// # Errors
    ///
    /// Returns [`WcError::ConfigError`] if the explicit file cannot be read
    /// or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        match path {
            Some(path) => config.merge(Self::read_file(path)?),
            None => {
                if let Some(user_config) = Self::load_user_config() {
                    config.merge(user_config);
                }
            }
        }

        config.apply_env_overrides();

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Read and parse one config file.
    ///
    /// # Errors
    ///
    /// Returns [`WcError::ConfigError`] if the file is missing, unreadable or
    /// not valid TOML for this schema.
    pub fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WcError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| WcError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Load the user configuration file from the standard location.
    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        if !config_path.exists() {
            debug!("Config file not found: {}", config_path.display());
            return None;
        }
        match Self::read_file(&config_path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring config file: {e}");
                None
            }
        }
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wcdump").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `WCDUMP_*` overrides read through `lookup`. Unparseable values
    /// are ignored with a warning.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(tz) = lookup("WCDUMP_TZ").filter(|v| !v.trim().is_empty()) {
            self.window.timezone = tz;
        }

        if let Some(flag) = lookup("WCDUMP_OUTGOING_FLAG") {
            match flag.trim().parse() {
                Ok(n) => self.decode.outgoing_flag = n,
                Err(_) => warn!("Ignoring WCDUMP_OUTGOING_FLAG={flag}: not an integer"),
            }
        }
        if let Some(mode) = lookup("WCDUMP_BINARY_BODIES") {
            match mode.parse() {
                Ok(m) => self.decode.binary_bodies = m,
                Err(e) => warn!("Ignoring WCDUMP_BINARY_BODIES: {e}"),
            }
        }

        if let Some(path) = lookup("WCDUMP_OUTPUT").filter(|v| !v.is_empty()) {
            self.output.path = Some(PathBuf::from(path));
        }
        if lookup("NO_COLOR").is_some() {
            self.output.colors = false;
        }

        if let Some(parallel) = lookup("WCDUMP_PARALLEL") {
            match parse_bool(&parallel) {
                Some(b) => self.scan.parallel = b,
                None => warn!("Ignoring WCDUMP_PARALLEL={parallel}: expected true or false"),
            }
        }
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        self.window.timezone = other.window.timezone;

        self.decode.outgoing_flag = other.decode.outgoing_flag;
        self.decode.binary_bodies = other.decode.binary_bodies;

        if other.output.path.is_some() {
            self.output.path = other.output.path;
        }
        self.output.pretty = other.output.pretty;
        self.output.colors = other.output.colors;

        self.scan.parallel = other.scan.parallel;
    }

    /// JSON output path, using the default if not configured.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    /// Scan options derived from the `[decode]` and `[scan]` sections.
    #[must_use]
    pub const fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            extract: ExtractOptions {
                outgoing_flag: self.decode.outgoing_flag,
                binary_bodies: self.decode.binary_bodies,
            },
            parallel: self.scan.parallel,
        }
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
