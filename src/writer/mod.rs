//! # Chunk Writers
//!
//! [`ChunkWriter`] is the terminal side effect of a chunk task. A write is
//! attempted once per chunk and either applies to the whole chunk or
//! reports the chunk failed.

pub mod in_memory;
pub mod logging;

use async_trait::async_trait;

use crate::error::WriteError;
use crate::models::{Chunk, Record};

pub use in_memory::{InMemoryChunkWriter, WrittenChunk};
pub use logging::LoggingChunkWriter;

/// Consumes a chunk and performs the terminal side effect
///
/// Called concurrently from executor workers, at most `throttle_limit`
/// calls in flight. Implementations must be safe to retry at chunk
/// granularity.
#[async_trait]
pub trait ChunkWriter<R: Record>: Send + Sync {
    async fn write(&self, chunk: &Chunk<R>) -> Result<(), WriteError>;

    fn name(&self) -> &str {
        "chunk_writer"
    }
}
