//! Parameters for a single job invocation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::{BatchConfig, ExecutorConfig};
use crate::constants;
use crate::error::{BatchError, BatchResult};

/// Sizing and identity of one job run
///
/// `run_id` is the run-distinguishing token. It is normally left empty and
/// filled in by the launcher's [`RunIdIncrementer`](crate::job::RunIdIncrementer),
/// so invoking a job twice with otherwise identical parameters still yields
/// two independent runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    pub chunk_size: usize,
    pub page_size: usize,
    pub throttle_limit: usize,
    pub keep_alive_seconds: u64,
    pub allow_core_thread_timeout: bool,
    pub run_id: Option<u64>,
    /// Free-form identifying parameters supplied by the caller
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Default for JobParameters {
    fn default() -> Self {
        Self {
            chunk_size: constants::DEFAULT_CHUNK_SIZE,
            page_size: constants::DEFAULT_PAGE_SIZE,
            throttle_limit: constants::DEFAULT_THROTTLE_LIMIT,
            keep_alive_seconds: constants::DEFAULT_KEEP_ALIVE_SECONDS,
            allow_core_thread_timeout: constants::DEFAULT_ALLOW_CORE_THREAD_TIMEOUT,
            run_id: None,
            extra: BTreeMap::new(),
        }
    }
}

impl JobParameters {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            chunk_size: config.job.chunk_size,
            page_size: config.job.page_size,
            throttle_limit: config.executor.throttle_limit,
            keep_alive_seconds: config.executor.keep_alive_seconds,
            allow_core_thread_timeout: config.executor.allow_core_thread_timeout,
            run_id: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_throttle_limit(mut self, throttle_limit: usize) -> Self {
        self.throttle_limit = throttle_limit;
        self
    }

    pub fn with_keep_alive_seconds(mut self, keep_alive_seconds: u64) -> Self {
        self.keep_alive_seconds = keep_alive_seconds;
        self
    }

    pub fn with_allow_core_thread_timeout(mut self, allow: bool) -> Self {
        self.allow_core_thread_timeout = allow;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    /// Executor settings for this run; the worker name prefix comes from
    /// static configuration
    pub fn executor_config(&self, worker_name_prefix: &str) -> ExecutorConfig {
        ExecutorConfig {
            throttle_limit: self.throttle_limit,
            keep_alive_seconds: self.keep_alive_seconds,
            allow_core_thread_timeout: self.allow_core_thread_timeout,
            worker_name_prefix: worker_name_prefix.to_string(),
        }
    }

    /// All parameters as a flat string map, including `run.id` when assigned
    pub fn to_identifying_map(&self) -> BTreeMap<String, String> {
        let mut map = self.extra.clone();
        map.insert("chunk_size".to_string(), self.chunk_size.to_string());
        map.insert("page_size".to_string(), self.page_size.to_string());
        map.insert("throttle_limit".to_string(), self.throttle_limit.to_string());
        if let Some(run_id) = self.run_id {
            map.insert(constants::RUN_ID_PARAMETER.to_string(), run_id.to_string());
        }
        map
    }

    pub fn validate(&self) -> BatchResult<()> {
        let checks = [
            ("chunk_size", self.chunk_size as u64),
            ("page_size", self.page_size as u64),
            ("throttle_limit", self.throttle_limit as u64),
            ("keep_alive_seconds", self.keep_alive_seconds),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(BatchError::InvalidParameter(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        if self.throttle_limit > Semaphore::MAX_PERMITS {
            return Err(BatchError::InvalidParameter(format!(
                "throttle_limit must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}
