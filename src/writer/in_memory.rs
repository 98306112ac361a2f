use async_trait::async_trait;
use parking_lot::Mutex;

use super::ChunkWriter;
use crate::error::WriteError;
use crate::executor::current_worker;
use crate::models::{Chunk, Record};

/// A chunk as it reached the writer, with the worker that wrote it
#[derive(Debug, Clone)]
pub struct WrittenChunk<R> {
    pub chunk: Chunk<R>,
    pub worker: Option<String>,
}

/// Collects every written chunk in memory
#[derive(Debug)]
pub struct InMemoryChunkWriter<R> {
    written: Mutex<Vec<WrittenChunk<R>>>,
}

impl<R: Record> InMemoryChunkWriter<R> {
    pub fn new() -> Self {
        Self {
            written: Mutex::new(Vec::new()),
        }
    }

    /// Written chunks ordered by chunk index, regardless of completion order
    pub fn written(&self) -> Vec<WrittenChunk<R>> {
        let mut written = self.written.lock().clone();
        written.sort_by_key(|entry| entry.chunk.index());
        written
    }

    pub fn chunk_count(&self) -> usize {
        self.written.lock().len()
    }

    pub fn item_count(&self) -> usize {
        self.written.lock().iter().map(|entry| entry.chunk.len()).sum()
    }

    /// All written record ids in stream order
    pub fn written_ids(&self) -> Vec<R::Id> {
        self.written()
            .iter()
            .flat_map(|entry| entry.chunk.ids())
            .collect()
    }
}

impl<R: Record> Default for InMemoryChunkWriter<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> ChunkWriter<R> for InMemoryChunkWriter<R> {
    async fn write(&self, chunk: &Chunk<R>) -> Result<(), WriteError> {
        self.written.lock().push(WrittenChunk {
            chunk: chunk.clone(),
            worker: current_worker(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory_writer"
    }
}
