//! Configuration management for debug-mirror.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::session::SessionOptions;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub logging: LoggingSection,
    /// UI context configuration.
    pub ui: UiSection,
    /// Session shutdown configuration.
    pub shutdown: ShutdownSection,
    /// Scenario replay configuration.
    pub scenario: ScenarioSection,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// UI context configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// Name of the UI thread.
    pub thread_name: String,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            thread_name: "debug-mirror-ui".to_string(),
        }
    }
}

/// Shutdown configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownSection {
    /// How long a session shutdown waits for its tasks, in milliseconds.
    pub join_timeout_ms: u64,
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            join_timeout_ms: 5000,
        }
    }
}

/// Scenario replay configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSection {
    /// Scenario file to replay.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(level) = std::env::var("DEBUG_MIRROR_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }

        if let Ok(timeout) = std::env::var("DEBUG_MIRROR_JOIN_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                self.shutdown.join_timeout_ms = timeout;
            }
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if let Some(timeout) = args.join_timeout_ms {
            self.shutdown.join_timeout_ms = timeout;
        }

        if let Some(ref path) = args.scenario {
            self.scenario.path = Some(path.clone());
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Options applied to every mirrored session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            join_timeout: Duration::from_millis(self.shutdown.join_timeout_ms),
        }
    }

    /// Scenario file to replay.
    pub fn scenario_path(&self) -> Result<&Path, ConfigError> {
        self.scenario
            .path
            .as_deref()
            .ok_or(ConfigError::MissingScenario)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Neither `--scenario` nor `scenario.path` names a scenario file.
    MissingScenario,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::MissingScenario => {
                write!(f, "no scenario given (use --scenario or scenario.path)")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
