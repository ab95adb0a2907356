//! Logging setup

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Logging configuration taken from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level or filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// JSON lines instead of human-readable text
    pub json: bool,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, json: bool) -> Self {
        Self {
            level: level.into(),
            json,
        }
    }

    /// `RUST_LOG` wins over the configured level
    pub fn filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| anyhow!("Invalid log level '{}': {}", self.level, e)),
        }
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// free for plan and probe output.
    pub fn init(&self) -> Result<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter()?)
            .with_writer(std::io::stderr)
            .with_target(false);

        let installed = if self.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        installed.map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

        tracing::debug!("Logging initialized at '{}'", self.level);
        Ok(())
    }
}

/// Install logging for the CLI
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    LoggingConfig::new(level, json).init()
}
