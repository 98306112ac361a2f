//! Execution record of one job run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::executor::{ChunkResult, PoolLifecycle};
use crate::models::JobParameters;
use crate::state_machine::JobState;

/// Everything observable about one job run
///
/// Created when the launcher accepts an invocation, mutated only by the job
/// controller while the run is in progress, and never changed once the
/// status is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobExecutionContext {
    execution_id: Uuid,
    run_id: u64,
    job_name: String,
    parameters: JobParameters,
    status: JobState,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    pages_fetched: usize,
    items_read: usize,
    items_written: usize,
    chunks_succeeded: usize,
    chunks_failed: usize,
    chunk_results: Vec<ChunkResult>,
    failures: Vec<String>,
    executor_lifecycle: Option<PoolLifecycle>,
}

impl JobExecutionContext {
    pub fn new(job_name: impl Into<String>, parameters: JobParameters, run_id: u64) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            run_id,
            job_name: job_name.into(),
            parameters,
            status: JobState::NotStarted,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            pages_fetched: 0,
            items_read: 0,
            items_written: 0,
            chunks_succeeded: 0,
            chunks_failed: 0,
            chunk_results: Vec::new(),
            failures: Vec::new(),
            executor_lifecycle: None,
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    pub fn status(&self) -> JobState {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn items_read(&self) -> usize {
        self.items_read
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Chunks whose results were collected, successful or not
    pub fn chunks_processed(&self) -> usize {
        self.chunks_succeeded + self.chunks_failed
    }

    pub fn chunks_succeeded(&self) -> usize {
        self.chunks_succeeded
    }

    pub fn chunks_failed(&self) -> usize {
        self.chunks_failed
    }

    /// Per-chunk results ordered by chunk index
    pub fn chunk_results(&self) -> &[ChunkResult] {
        &self.chunk_results
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Executor lifecycle observed when the run finished
    pub fn executor_lifecycle(&self) -> Option<PoolLifecycle> {
        self.executor_lifecycle
    }

    pub(crate) fn mark_started(&mut self, status: JobState) {
        self.status = status;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn record_read_stats(&mut self, pages_fetched: usize, items_read: usize) {
        self.pages_fetched = pages_fetched;
        self.items_read = items_read;
    }

    pub(crate) fn record_chunk_result(&mut self, result: ChunkResult) {
        if result.is_success() {
            self.chunks_succeeded += 1;
            self.items_written += result.item_count;
        } else {
            self.chunks_failed += 1;
            if let Some(error) = &result.error {
                self.failures
                    .push(format!("chunk {}: {error}", result.chunk_index));
            }
        }
        let position = self
            .chunk_results
            .partition_point(|existing| existing.chunk_index < result.chunk_index);
        self.chunk_results.insert(position, result);
    }

    pub(crate) fn record_failure(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    pub(crate) fn finish(&mut self, status: JobState, executor_lifecycle: PoolLifecycle) {
        self.status = status;
        self.executor_lifecycle = Some(executor_lifecycle);
        self.ended_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChunkFailure, WriteError};

    #[test]
    fn test_new_context_is_not_started() {
        let context = JobExecutionContext::new("exampleJob", JobParameters::default(), 1);
        assert_eq!(context.status(), JobState::NotStarted);
        assert_eq!(context.run_id(), 1);
        assert!(context.started_at().is_none());
        assert!(context.duration_ms().is_none());
        assert!(!context.is_terminal());
    }

    #[test]
    fn test_chunk_results_are_kept_in_index_order() {
        let mut context = JobExecutionContext::new("exampleJob", JobParameters::default(), 1);
        context.record_chunk_result(ChunkResult::succeeded(2, 10, "executor-1", 3));
        context.record_chunk_result(ChunkResult::failed(
            0,
            10,
            "executor-2",
            ChunkFailure::Write(WriteError::Unavailable("down".to_string())),
            1,
        ));
        context.record_chunk_result(ChunkResult::succeeded(1, 5, "executor-1", 2));

        let indexes: Vec<u64> = context.chunk_results().iter().map(|r| r.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(context.chunks_succeeded(), 2);
        assert_eq!(context.chunks_failed(), 1);
        assert_eq!(context.chunks_processed(), 3);
        assert_eq!(context.items_written(), 15);
        assert_eq!(
            context.failures().to_vec(),
            vec!["chunk 0: Sink unavailable: down".to_string()]
        );
    }
}
