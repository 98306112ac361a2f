//! # Structured Logging
//!
//! Environment-aware console logging on top of `tracing`.
//!
//! - Console output, pretty or JSON, selected by [`LoggingConfig`]
//! - Level chosen from `LOG_LEVEL` / `RUST_LOG`, else from the environment
//!   name (`BATCHLINE_ENV`, then `APP_ENV`, default `development`)
//! - Safe to call more than once and safe when a global subscriber already
//!   exists (tests, embedding applications)
//!
//! Job and chunk events go through [`log_job!`](crate::log_job) and
//! [`log_chunk!`](crate::log_chunk) so every line carries the same fields.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};
use crate::constants::env;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging with defaults derived from the environment
pub fn init_structured_logging() {
    init_with_config(&LoggingConfig::default());
}

/// Initialize console logging using an explicit logging configuration
pub fn init_with_config(config: &LoggingConfig) {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = resolve_log_level(&environment, config.level.as_deref(), explicit_level());
        let use_ansi = std::io::stdout().is_terminal();

        let console_layer = match config.format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level))
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_current_span(true)
                .with_filter(EnvFilter::new(&log_level))
                .boxed(),
        };

        let subscriber = tracing_subscriber::registry().with(console_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                level = %log_level,
                format = ?config.format,
                ansi_colors = use_ansi,
                "Structured logging initialized"
            );
        }
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var(env::ENVIRONMENT)
        .or_else(|_| std::env::var(env::FALLBACK_ENVIRONMENT))
        .unwrap_or_else(|_| "development".to_string())
}

fn explicit_level() -> Option<String> {
    std::env::var("LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
}

/// Pick the filter directive: process environment beats configuration,
/// configuration beats the per-environment default.
fn resolve_log_level(
    environment: &str,
    configured: Option<&str>,
    from_env: Option<String>,
) -> String {
    if let Some(level) = from_env {
        return level.to_lowercase();
    }
    if let Some(level) = configured {
        return level.to_lowercase();
    }

    match environment {
        "test" | "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log job lifecycle operations with uniform fields
#[macro_export]
macro_rules! log_job {
    ($level:ident, $operation:expr, job_name: $job_name:expr, run_id: $run_id:expr $(, $key:ident: $value:expr)* $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            job_name = %$job_name,
            run_id = $run_id,
            $($key = ?$value,)*
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "JOB_{}", $operation
        );
    };
    ($level:ident, $operation:expr $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "JOB_{}", $operation
        );
    };
}

/// Log chunk operations with uniform fields
#[macro_export]
macro_rules! log_chunk {
    ($level:ident, $operation:expr, chunk_index: $chunk_index:expr, worker: $worker:expr $(, $key:ident: $value:expr)* $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            chunk_index = $chunk_index,
            worker = %$worker,
            $($key = ?$value,)*
            "CHUNK_{}", $operation
        );
    };
    ($level:ident, $operation:expr, chunk_index: $chunk_index:expr $(,)?) => {
        tracing::$level!(
            operation = %$operation,
            chunk_index = $chunk_index,
            "CHUNK_{}", $operation
        );
    };
}
