//! The transform stage between reading and writing a chunk.

use async_trait::async_trait;

use crate::error::ProcessError;
use crate::models::{Chunk, Record};

/// Transforms a chunk before it reaches the writer
///
/// Runs on the worker that owns the chunk. An error fails the chunk; the
/// writer is not called for it.
#[async_trait]
pub trait ChunkProcessor<R: Record>: Send + Sync {
    async fn process(&self, chunk: Chunk<R>) -> Result<Chunk<R>, ProcessError>;
}

/// Hands chunks to the writer unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughProcessor;

#[async_trait]
impl<R: Record> ChunkProcessor<R> for PassThroughProcessor {
    async fn process(&self, chunk: Chunk<R>) -> Result<Chunk<R>, ProcessError> {
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExampleRecord;

    #[tokio::test]
    async fn test_pass_through_returns_chunk_unchanged() {
        let chunk = Chunk::new(0, ExampleRecord::sequence(3));
        let processed = PassThroughProcessor.process(chunk.clone()).await.unwrap();
        assert_eq!(processed, chunk);
    }
}
