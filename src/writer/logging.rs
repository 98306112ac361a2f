use async_trait::async_trait;

use super::ChunkWriter;
use crate::error::WriteError;
use crate::executor::current_worker;
use crate::log_chunk;
use crate::models::{Chunk, Record};

/// Emits one structured event per chunk
///
/// Records the chunk index, item count and id range rather than every id,
/// so event size does not grow with the chunk.
#[derive(Debug, Clone)]
pub struct LoggingChunkWriter {
    name: String,
}

impl LoggingChunkWriter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LoggingChunkWriter {
    fn default() -> Self {
        Self::new("logging_writer")
    }
}

#[async_trait]
impl<R: Record> ChunkWriter<R> for LoggingChunkWriter {
    async fn write(&self, chunk: &Chunk<R>) -> Result<(), WriteError> {
        let worker = current_worker().unwrap_or_else(|| "unassigned".to_string());
        log_chunk!(
            info,
            "WRITTEN",
            chunk_index: chunk.index(),
            worker: worker,
            writer: self.name,
            items: chunk.len(),
            first_id: chunk.first_id(),
            last_id: chunk.last_id()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
