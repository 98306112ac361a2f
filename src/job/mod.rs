//! # Job Execution
//!
//! - [`Job`] / [`JobBuilder`] - what a job reads, processes and writes
//! - [`JobController`] - one run, `NOT_STARTED → RUNNING → {COMPLETED, FAILED}`
//! - [`JobLauncher`] - named jobs and `run_job`, with run ids from
//!   [`RunIdIncrementer`]
//! - [`JobRepository`] - executions by run id; finished runs are never
//!   restarted
//! - [`JobExecutionListener`] - `before_job` / `after_job` callbacks

pub mod controller;
pub mod definition;
pub mod launcher;
pub mod listener;
pub mod repository;

pub use controller::JobController;
pub use definition::{Job, JobBuilder};
pub use launcher::{JobLauncher, RunIdIncrementer};
pub use listener::{JobExecutionListener, LoggingListener, NoopListener};
pub use repository::JobRepository;
