use serde::{Deserialize, Serialize};

use crate::error::ChunkFailure;

/// Outcome of one chunk task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunk_index: u64,
    /// Items handed to the writer (after processing) or, on failure, items
    /// in the submitted chunk
    pub item_count: usize,
    pub worker: String,
    pub duration_ms: u64,
    pub error: Option<ChunkFailure>,
}

impl ChunkResult {
    pub fn succeeded(
        chunk_index: u64,
        item_count: usize,
        worker: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            chunk_index,
            item_count,
            worker: worker.into(),
            duration_ms,
            error: None,
        }
    }

    pub fn failed(
        chunk_index: u64,
        item_count: usize,
        worker: impl Into<String>,
        failure: ChunkFailure,
        duration_ms: u64,
    ) -> Self {
        Self {
            chunk_index,
            item_count,
            worker: worker.into(),
            duration_ms,
            error: Some(failure),
        }
    }

    /// The worker went away without reporting
    pub fn lost(chunk_index: u64, item_count: usize) -> Self {
        Self::failed(chunk_index, item_count, "unassigned", ChunkFailure::Lost, 0)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
