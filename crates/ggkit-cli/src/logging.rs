//! Tracing subscriber setup
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

/// Filter used when `RUST_LOG` is unset
///
/// `-v` flags raise the configured level one step each.
#[must_use]
pub fn default_filter(config: &LogConfig, verbose: u8) -> String {
    config.level.raised_by(verbose).as_str().to_string()
}

/// Install the global subscriber
pub fn init_logging(config: &LogConfig, verbose: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config, verbose)));

    let init_result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_env_filter(filter)
            .try_init(),
    };
    init_result.map_err(|e| anyhow!("Failed to init subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_default_filter() {
        let config = LogConfig::default();
        assert_eq!(default_filter(&config, 0), "warn");
        assert_eq!(default_filter(&config, 2), "debug");

        let config = LogConfig {
            level: LogLevel::Info,
            ..LogConfig::default()
        };
        assert_eq!(default_filter(&config, 1), "debug");
    }
}
