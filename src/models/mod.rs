//! # Batch Data Model
//!
//! - [`Record`] / [`ExampleRecord`] - items read from a paged source
//! - [`PageRequest`] / [`Page`] - one store-level fetch
//! - [`Chunk`] - the unit of work handed to a writer
//! - [`JobParameters`] / [`JobExecutionContext`] - one job run

pub mod chunk;
pub mod job_execution;
pub mod job_parameters;
pub mod page;
pub mod record;

pub use chunk::Chunk;
pub use job_execution::JobExecutionContext;
pub use job_parameters::JobParameters;
pub use page::{Page, PageRequest, Sort, SortDirection};
pub use record::{ExampleRecord, Record};
