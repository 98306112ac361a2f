//! Error types for the batch engine.
//!
//! Component-level failures (`ReadError`, `WriteError`, `ProcessError`) are
//! captured as structured values and folded into the job's terminal status
//! by the job controller. `BatchError` is what public operations return.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Read error: {0}")]
    Read(#[from] ReadError),
    #[error("Executor is shut down and no longer accepts chunks")]
    ExecutorShutdown,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Job not found: {0}")]
    JobNotFound(String),
    #[error(
        "Job execution run {run_id} already finished with status {status}; restart is prevented"
    )]
    RestartPrevented { run_id: u64, status: String },
    #[error("State machine error: {0}")]
    StateMachineError(String),
}

impl From<ConfigurationError> for BatchError {
    fn from(error: ConfigurationError) -> Self {
        BatchError::ConfigurationError(error.to_string())
    }
}

impl From<StateMachineError> for BatchError {
    fn from(error: StateMachineError) -> Self {
        BatchError::StateMachineError(error.to_string())
    }
}

pub type BatchResult<T> = std::result::Result<T, BatchError>;

/// Failure while fetching a page from a [`PagedSource`](crate::reader::PagedSource).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ReadError {
    #[error("Failed to fetch page {page_index}: {reason}")]
    FetchFailed { page_index: usize, reason: String },
    #[error("Unsupported sort key '{key}'")]
    UnsupportedSortKey { key: String },
    #[error("Database error: {0}")]
    Database(String),
}

impl ReadError {
    pub fn fetch_failed(page_index: usize, reason: impl Into<String>) -> Self {
        ReadError::FetchFailed {
            page_index,
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ReadError {
    fn from(err: sqlx::Error) -> Self {
        ReadError::Database(err.to_string())
    }
}

/// Failure reported by a [`ChunkWriter`](crate::writer::ChunkWriter).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WriteError {
    #[error("Chunk rejected by sink: {0}")]
    Rejected(String),
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WriteError {
    fn from(error: serde_json::Error) -> Self {
        WriteError::Serialization(error.to_string())
    }
}

/// Failure reported by a [`ChunkProcessor`](crate::step::ChunkProcessor).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Processing failed: {reason}")]
pub struct ProcessError {
    pub reason: String,
}

impl ProcessError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Why a single chunk did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ChunkFailure {
    #[error("{0}")]
    Write(WriteError),
    #[error("{0}")]
    Process(ProcessError),
    #[error("Worker panicked while processing chunk: {0}")]
    Panicked(String),
    #[error("Chunk result was lost before completion")]
    Lost,
}

impl From<WriteError> for ChunkFailure {
    fn from(error: WriteError) -> Self {
        ChunkFailure::Write(error)
    }
}

impl From<ProcessError> for ChunkFailure {
    fn from(error: ProcessError) -> Self {
        ChunkFailure::Process(error)
    }
}
