#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batchline Core
//!
//! Chunk-oriented batch processing: read a large ordered dataset one page at
//! a time, cut it into fixed-size chunks, and write the chunks on a bounded
//! pool of concurrent workers.
//!
//! ## Architecture
//!
//! ```text
//! JobLauncher ─▶ JobController ─ before_job
//!                    │
//!                    ├─ loop: PagedSource ─▶ PagingReader ─▶ ChunkAssembler
//!                    │                                         │ submit (backpressure)
//!                    │                     ThrottledExecutor ◀─┘
//!                    │                      └─ worker × throttle_limit: processor ─▶ writer
//!                    │
//!                    └─ shutdown(wait) ─▶ COMPLETED / FAILED ─▶ after_job
//! ```
//!
//! One task owns the reader and assembles chunks in source order; chunks
//! are written concurrently and may finish out of order. A read error stops
//! the run; a write error fails only its chunk. Either makes the run
//! `FAILED`. Finished runs are never restarted: every invocation gets a
//! fresh run id, reader and executor.
//!
//! ## Module Organization
//!
//! - [`reader`] - [`PagedSource`] contract and the buffered [`PagingReader`]
//! - [`step`] - chunk assembly and the per-chunk processor
//! - [`executor`] - the throttled worker pool
//! - [`writer`] - [`ChunkWriter`] contract and built-in writers
//! - [`job`] - job definitions, controller, launcher and repository
//! - [`state_machine`] - job states and transitions
//! - [`models`] - records, pages, chunks, parameters and execution context
//! - [`config`] - layered configuration
//! - [`error`] - structured error handling
//! - [`logging`] - structured console logging
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use batchline_core::{
//!     ExampleRecord, InMemoryChunkWriter, InMemoryPagedSource, Job, JobLauncher, JobParameters,
//!     JobState,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # tokio_test::block_on(async {
//! let writer = Arc::new(InMemoryChunkWriter::<ExampleRecord>::new());
//! let job = Job::<ExampleRecord>::builder("exampleJob")
//!     .source(Arc::new(InMemoryPagedSource::new("example", ExampleRecord::sequence(250))))
//!     .writer(writer.clone())
//!     .build()?;
//!
//! let launcher = JobLauncher::new();
//! launcher.register(job)?;
//!
//! let context = launcher.run_job("exampleJob", JobParameters::default()).await?;
//! assert_eq!(context.status(), JobState::Completed);
//! assert_eq!(context.chunks_processed(), 3);
//! assert_eq!(writer.item_count(), 250);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod executor;
pub mod job;
pub mod logging;
pub mod models;
pub mod reader;
pub mod state_machine;
pub mod step;
pub mod writer;

pub use config::{BatchConfig, ConfigManager, ConfigurationError, ExecutorConfig, JobConfig};
pub use error::{BatchError, BatchResult, ChunkFailure, ProcessError, ReadError, WriteError};
pub use executor::{ChunkHandle, ChunkResult, PoolLifecycle, ThrottledExecutor, WorkerPoolState};
pub use job::{
    Job, JobBuilder, JobController, JobExecutionListener, JobLauncher, JobRepository,
    LoggingListener, NoopListener, RunIdIncrementer,
};
pub use models::{
    Chunk, ExampleRecord, JobExecutionContext, JobParameters, Page, PageRequest, Record, Sort,
    SortDirection,
};
pub use reader::{InMemoryPagedSource, PagedSource, PagingReader, ReaderCursor};
pub use state_machine::{JobEvent, JobState, JobStateMachine, StateMachineError};
pub use step::{ChunkAssembler, ChunkProcessor, PassThroughProcessor};
pub use writer::{ChunkWriter, InMemoryChunkWriter, LoggingChunkWriter};

#[cfg(feature = "postgres")]
pub use reader::PgPagedSource;
