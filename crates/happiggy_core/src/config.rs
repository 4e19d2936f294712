//! Runtime configuration resolved by the host or the environment.
//!
//! # Invariants
//! - `db_path` is never empty.
//! - `log_level` is always one of the supported level names.

use crate::logging::{LogLevel, LoggingError};
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "HAPPIGGY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "HAPPIGGY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HAPPIGGY_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "happiggy.sqlite3";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("db_path cannot be empty")]
    EmptyDbPath,
    #[error(transparent)]
    Logging(#[from] LoggingError),
}

/// Paths and levels the core needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging is skipped when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: LogLevel::build_default().as_str(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Builds a config from explicit values; blank optional values fall back
    /// to defaults.
    pub fn from_values(
        db_path: Option<&str>,
        log_level: Option<&str>,
        log_dir: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let db_path = match non_blank(db_path) {
            Some(path) => PathBuf::from(path),
            None => defaults.db_path,
        };
        let log_level = match non_blank(log_level) {
            Some(level) => LogLevel::parse(level)?.as_str(),
            None => defaults.log_level,
        };
        let config = Self {
            db_path,
            log_level,
            log_dir: non_blank(log_dir).map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads `HAPPIGGY_DB_PATH`, `HAPPIGGY_LOG_LEVEL` and `HAPPIGGY_LOG_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var(ENV_DB_PATH).ok();
        let log_level = std::env::var(ENV_LOG_LEVEL).ok();
        let log_dir = std::env::var(ENV_LOG_DIR).ok();
        Self::from_values(db_path.as_deref(), log_level.as_deref(), log_dir.as_deref())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        LogLevel::parse(self.log_level)?;
        Ok(())
    }
}

/// Database file in the OS temp directory.
pub fn default_db_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{default_db_path, CoreConfig};
    use std::path::PathBuf;

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = CoreConfig::from_values(Some("  "), None, Some("")).unwrap();
        assert_eq!(config.db_path, default_db_path());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn explicit_values_are_normalized() {
        let config =
            CoreConfig::from_values(Some("/data/bank.db"), Some("Warning"), Some("/data/logs"))
                .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/bank.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/data/logs")));
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!(CoreConfig::from_values(None, Some("loud"), None).is_err());
    }
}
