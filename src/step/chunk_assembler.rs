//! Groups the record stream into fixed-size chunks.

use tracing::{debug, warn};

use crate::error::ReadError;
use crate::models::{Chunk, Record};
use crate::reader::PagingReader;

/// Pulls records from a [`PagingReader`] and cuts them into chunks
///
/// Every chunk but the last holds exactly `chunk_size` records; the last
/// holds whatever remains (never zero). Chunks are numbered from 0 in
/// source order. A read error discards the chunk being assembled.
pub struct ChunkAssembler<R: Record> {
    reader: PagingReader<R>,
    chunk_size: usize,
    next_index: u64,
    exhausted: bool,
}

impl<R: Record> ChunkAssembler<R> {
    pub fn new(reader: PagingReader<R>, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size,
            next_index: 0,
            exhausted: false,
        }
    }

    /// Next chunk in source order, or `None` once the stream is complete
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk<R>>, ReadError> {
        if self.exhausted {
            return Ok(None);
        }

        // Chunk size is caller-controlled; grow past one page on demand
        let mut items = Vec::with_capacity(self.chunk_size.min(self.reader.page_size()));
        while items.len() < self.chunk_size {
            match self.reader.read().await {
                Ok(Some(record)) => items.push(record),
                Ok(None) => {
                    self.exhausted = true;
                    break;
                }
                Err(error) => {
                    self.exhausted = true;
                    if !items.is_empty() {
                        warn!(
                            chunk_index = self.next_index,
                            discarded = items.len(),
                            "Discarding partially assembled chunk after read error"
                        );
                    }
                    return Err(error);
                }
            }
        }

        if items.is_empty() {
            debug!(
                chunks_assembled = self.next_index,
                "Chunk assembly complete"
            );
            return Ok(None);
        }

        let chunk = Chunk::new(self.next_index, items);
        self.next_index += 1;
        Ok(Some(chunk))
    }

    pub fn chunks_assembled(&self) -> u64 {
        self.next_index
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn reader(&self) -> &PagingReader<R> {
        &self.reader
    }
}
