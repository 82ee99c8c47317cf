// depgate-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{GateError, Result};

const DEFAULT_LOG_FILTER: &str = "info";
pub const LOG_FILTER_VAR: &str = "DEPGATE_LOG";
pub const LOG_DIR_VAR: &str = "DEPGATE_LOG_DIR";
pub const LOG_ANSI_VAR: &str = "DEPGATE_LOG_ANSI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_filter: String,
    pub log_dir: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
            ansi: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading depgate configuration");
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source; `load` passes the process environment.
    pub fn from_source<F>(source: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_filter = source(LOG_FILTER_VAR)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                debug!(
                    "{} not set or empty, falling back to default: {}",
                    LOG_FILTER_VAR, DEFAULT_LOG_FILTER
                );
                DEFAULT_LOG_FILTER.to_string()
            });

        let log_dir = source(LOG_DIR_VAR)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let ansi = match source(LOG_ANSI_VAR) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                GateError::Config(format!(
                    "{LOG_ANSI_VAR} must be a boolean flag, got '{raw}'"
                ))
            })?,
            None => true,
        };

        debug!("Configuration loaded successfully.");
        Ok(Self {
            log_filter,
            log_dir,
            ansi,
        })
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
