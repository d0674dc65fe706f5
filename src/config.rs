use crate::signals::{SignalNumber, DEFAULT_PRIMARY_SIGNAL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::level_filters::LevelFilter;

/// Top-level configuration, optionally loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmartKillConfig {
    pub escalation: EscalationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscalationConfig {
    /// Primary signal number. Not validated: the OS judges it at delivery.
    pub signal: i32,
    /// Grace deadline after the primary signal, in milliseconds. Negative
    /// values behave like 0.
    pub wait_ms: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

/// Log verbosity accepted by `--log-level` and `logging.level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub primary_signal: SignalNumber,
    pub grace: Duration,
    pub log_level: LogLevel,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl SmartKillConfig {
    /// Load configuration from a TOML file. Missing sections and keys fall
    /// back to defaults; unknown keys are rejected.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line values on top of file/default values.
    pub fn with_overrides(
        mut self,
        signal: Option<i32>,
        wait_ms: Option<i64>,
        log_level: Option<LogLevel>,
    ) -> Self {
        if let Some(signal) = signal {
            self.escalation.signal = signal;
        }
        if let Some(wait_ms) = wait_ms {
            self.escalation.wait_ms = wait_ms;
        }
        if let Some(level) = log_level {
            self.logging.level = level;
        }
        self
    }

    /// Settings the escalation run consumes.
    pub fn resolve(&self) -> Settings {
        let wait_ms = u64::try_from(self.escalation.wait_ms).unwrap_or(0);
        Settings {
            primary_signal: SignalNumber::new(self.escalation.signal),
            grace: Duration::from_millis(wait_ms),
            log_level: self.logging.level,
        }
    }
}

// --- Default implementations ---

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            signal: DEFAULT_PRIMARY_SIGNAL,
            wait_ms: 5000,
        }
    }
}
