//! # Batch Engine Configuration
//!
//! Typed configuration for chunk assembly, the throttled executor and
//! logging. Values are layered by [`ConfigManager`]:
//!
//! 1. Built-in defaults (see [`crate::constants`])
//! 2. Optional TOML file (`BATCHLINE_CONFIG`, else `config/batchline.toml`)
//! 3. Environment variables, e.g. `BATCHLINE_JOB__CHUNK_SIZE=50`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batchline_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let chunk_size = manager.config().job.chunk_size;
//! let workers = manager.config().executor.throttle_limit;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::constants;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Chunk and page sizing for job steps
    pub job: JobConfig,

    /// Worker pool sizing and idle policy
    pub executor: ExecutorConfig,

    /// Console logging settings
    pub logging: LoggingConfig,
}

/// Chunk-oriented step settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct JobConfig {
    pub chunk_size: usize,
    pub page_size: usize,
    /// Field the paging reader orders by (ascending)
    pub sort_key: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            chunk_size: constants::DEFAULT_CHUNK_SIZE,
            page_size: constants::DEFAULT_PAGE_SIZE,
            sort_key: constants::DEFAULT_SORT_KEY.to_string(),
        }
    }
}

/// Throttled executor settings
///
/// Core size and max size are both `throttle_limit`; the pool never grows
/// elastically.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub throttle_limit: usize,
    pub keep_alive_seconds: u64,
    pub allow_core_thread_timeout: bool,
    pub worker_name_prefix: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            throttle_limit: constants::DEFAULT_THROTTLE_LIMIT,
            keep_alive_seconds: constants::DEFAULT_KEEP_ALIVE_SECONDS,
            allow_core_thread_timeout: constants::DEFAULT_ALLOW_CORE_THREAD_TIMEOUT,
            worker_name_prefix: constants::DEFAULT_WORKER_NAME_PREFIX.to_string(),
        }
    }
}

impl ExecutorConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.throttle_limit == 0 {
            return Err(ConfigurationError::invalid_value(
                "executor.throttle_limit",
                self.throttle_limit,
                "must be greater than 0",
            ));
        }
        if self.throttle_limit > Semaphore::MAX_PERMITS {
            return Err(ConfigurationError::invalid_value(
                "executor.throttle_limit",
                self.throttle_limit,
                format!("must not exceed {}", Semaphore::MAX_PERMITS),
            ));
        }
        if self.keep_alive_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "executor.keep_alive_seconds",
                self.keep_alive_seconds,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. `info`, `batchline_core=debug`); environment
    /// variables `LOG_LEVEL` / `RUST_LOG` take precedence
    pub level: Option<String>,
    pub format: LogFormat,
}

impl BatchConfig {
    /// Validate every section, failing on the first offending field
    pub fn validate(&self) -> ConfigResult<()> {
        if self.job.chunk_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "job.chunk_size",
                self.job.chunk_size,
                "must be greater than 0",
            ));
        }
        if self.job.page_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "job.page_size",
                self.job.page_size,
                "must be greater than 0",
            ));
        }
        if self.job.sort_key.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "job.sort_key",
                &self.job.sort_key,
                "must not be empty",
            ));
        }
        self.executor.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_constants() {
        let config = BatchConfig::default();
        assert_eq!(config.job.chunk_size, 100);
        assert_eq!(config.job.page_size, 100);
        assert_eq!(config.job.sort_key, "id");
        assert_eq!(config.executor.throttle_limit, 10);
        assert_eq!(config.executor.keep_alive(), Duration::from_secs(1));
        assert!(config.executor.allow_core_thread_timeout);
        assert_eq!(config.executor.worker_name_prefix, "executor-");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        let mut config = BatchConfig::default();
        config.job.page_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("job.page_size"));

        let mut config = BatchConfig::default();
        config.executor.throttle_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("executor.throttle_limit"));
    }

    #[test]
    fn test_throttle_limit_above_permit_ceiling_is_rejected() {
        let mut config = BatchConfig::default();
        config.executor.throttle_limit = Semaphore::MAX_PERMITS + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { field, .. })
                if field == "executor.throttle_limit"
        ));

        config.executor.throttle_limit = Semaphore::MAX_PERMITS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_sort_key_is_rejected() {
        let mut config = BatchConfig::default();
        config.job.sort_key = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { field, .. }) if field == "job.sort_key"
        ));
    }
}
