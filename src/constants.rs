//! Engine-wide defaults and well-known names.

/// Records per chunk handed to a single writer call
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Records requested per page fetch
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Maximum number of chunk tasks in flight (worker pool size)
pub const DEFAULT_THROTTLE_LIMIT: usize = 10;

/// Idle time after which a worker may be reclaimed
pub const DEFAULT_KEEP_ALIVE_SECONDS: u64 = 1;

pub const DEFAULT_ALLOW_CORE_THREAD_TIMEOUT: bool = true;

pub const DEFAULT_WORKER_NAME_PREFIX: &str = "executor-";

/// Column / field the paging reader orders by
pub const DEFAULT_SORT_KEY: &str = "id";

/// Job parameter key carrying the run-distinguishing token
pub const RUN_ID_PARAMETER: &str = "run.id";

/// Environment variable names
pub mod env {
    pub const ENVIRONMENT: &str = "BATCHLINE_ENV";
    pub const FALLBACK_ENVIRONMENT: &str = "APP_ENV";
    pub const CONFIG_PATH: &str = "BATCHLINE_CONFIG";
    pub const PREFIX: &str = "BATCHLINE";
}

pub const DEFAULT_CONFIG_PATH: &str = "config/batchline.toml";
