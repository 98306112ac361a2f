//! # Chunk-Oriented Step
//!
//! Assembly of chunks from the reader and the per-chunk transform.

pub mod chunk_assembler;
pub mod processor;

pub use chunk_assembler::ChunkAssembler;
pub use processor::{ChunkProcessor, PassThroughProcessor};
