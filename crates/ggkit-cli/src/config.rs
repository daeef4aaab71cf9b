//! CLI configuration
//!
//! Sources, lowest priority first:
//! 1. Default values
//! 2. A TOML file (`--config`)
//! 3. `GGKIT_*` environment variables

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ggkit::{ReadOptions, WriteOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Error message
        message: String,
    },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    #[default]
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    /// Level after applying `-v` flags on top of this one
    #[must_use]
    pub fn raised_by(self, verbose: u8) -> Self {
        let levels = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];
        let current = levels.iter().position(|&l| l == self).unwrap_or(1);
        levels[(current + usize::from(verbose)).min(levels.len() - 1)]
    }

    /// Filter directive understood by `EnvFilter`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue {
                field: "log.level".to_string(),
                message: format!("Invalid log level: {s}"),
            }),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines
    Json,
    /// Multi-line human-readable output
    Pretty,
    /// Single-line output
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            _ => Err(ConfigError::InvalidValue {
                field: "log.format".to_string(),
                message: format!("Invalid log format: {s}"),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Include the event target
    pub include_target: bool,
}

/// Top-level CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Logging
    pub log: LogConfig,
    /// Options for every read
    pub read: ReadOptions,
    /// Options for every write
    pub write: WriteOptions,
}

impl CliConfig {
    /// Check values that serde alone cannot
    pub fn validate(&self) -> Result<()> {
        self.write
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                field: "write.alignment".to_string(),
                message: e.to_string(),
            })?;
        if self.read.max_tensor_count == 0 || self.read.max_metadata_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "read".to_string(),
                message: "entry ceilings must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Create a loader that yields defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML file on top of the defaults
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Apply `<prefix>_*` environment variables last
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Load configuration from all sources
    pub fn load(&self) -> Result<CliConfig> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    /// Load configuration, resolving environment variables through `env`
    pub fn load_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<CliConfig> {
        let mut config = match &self.file {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                Self::load_from_str(&content)?
            }
            None => CliConfig::default(),
        };

        if let Some(prefix) = &self.env_prefix {
            Self::apply_env_overrides(&mut config, prefix, env)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document
    pub fn load_from_str(toml: &str) -> Result<CliConfig> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env_overrides(
        config: &mut CliConfig,
        prefix: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        let invalid = |field: &str, val: &str| ConfigError::InvalidValue {
            field: format!("{prefix}_{field}"),
            message: format!("cannot parse {val:?}"),
        };

        if let Some(val) = env(&format!("{prefix}_LOG_LEVEL")) {
            config.log.level = val.parse()?;
        }
        if let Some(val) = env(&format!("{prefix}_LOG_FORMAT")) {
            config.log.format = val.parse()?;
        }
        if let Some(val) = env(&format!("{prefix}_STRICT")) {
            config.read.strict = val.parse().map_err(|_| invalid("STRICT", &val))?;
        }
        if let Some(val) = env(&format!("{prefix}_ALIGNMENT")) {
            config.write.alignment = Some(val.parse().map_err(|_| invalid("ALIGNMENT", &val))?);
        }
        Ok(())
    }
}
