//! Drives one job run from `NOT_STARTED` to a terminal state.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, instrument};

use super::definition::Job;
use super::repository::JobRepository;
use crate::error::{BatchError, BatchResult};
use crate::executor::{ChunkHandle, ThrottledExecutor};
use crate::log_job;
use crate::models::{JobExecutionContext, Record};
use crate::reader::PagingReader;
use crate::state_machine::{JobEvent, JobState, JobStateMachine};
use crate::step::ChunkAssembler;

/// Runs a [`Job`] against a fresh execution context
///
/// Assembly and writing are pipelined: each chunk is submitted as soon as
/// it is assembled, and `submit` applies backpressure once the throttle
/// limit is reached. Read, write and processing failures never escape as
/// errors; they are folded into the context and turn the run `FAILED`.
pub struct JobController<R: Record> {
    job: Arc<Job<R>>,
    repository: Option<Arc<JobRepository>>,
}

struct AssemblyOutcome {
    handles: Vec<ChunkHandle>,
    pages_fetched: usize,
    items_read: usize,
    failure: Option<String>,
}

impl<R: Record> JobController<R> {
    pub fn new(job: Arc<Job<R>>) -> Self {
        Self {
            job,
            repository: None,
        }
    }

    /// Publish the `RUNNING` snapshot to `repository` once the run starts
    pub fn with_repository(mut self, repository: Arc<JobRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Execute the run described by `context`
    ///
    /// Returns an error only when the run cannot start: invalid parameters,
    /// or a context that is not `NOT_STARTED`. A terminal context is never
    /// resumed.
    #[instrument(
        skip(self, context),
        fields(job_name = %self.job.name(), run_id = context.run_id())
    )]
    pub async fn execute(
        &self,
        mut context: JobExecutionContext,
    ) -> BatchResult<JobExecutionContext> {
        match context.status() {
            JobState::NotStarted => {}
            status if status.is_terminal() => {
                return Err(BatchError::RestartPrevented {
                    run_id: context.run_id(),
                    status: status.to_string(),
                })
            }
            status => {
                return Err(BatchError::InvalidState(format!(
                    "run {} is already {status}",
                    context.run_id()
                )))
            }
        }

        let parameters = context.parameters().clone();
        parameters.validate()?;
        let executor = ThrottledExecutor::new(
            parameters.executor_config(self.job.worker_name_prefix()),
            Arc::clone(self.job.processor()),
            Arc::clone(self.job.writer()),
        )?;

        let mut state_machine = JobStateMachine::new(context.run_id());
        let running = state_machine.transition(JobEvent::Start)?;
        context.mark_started(running);
        if let Some(repository) = &self.repository {
            repository.update(&context);
        }
        self.job.listener().before_job(&context);
        log_job!(
            info,
            "STARTED",
            job_name: self.job.name(),
            run_id: context.run_id(),
            execution_id: context.execution_id(),
            chunk_size: parameters.chunk_size,
            page_size: parameters.page_size,
            throttle_limit: parameters.throttle_limit
        );

        let outcome = match executor.initialize() {
            Ok(()) => self.assemble_and_submit(&executor, &context).await,
            Err(err) => AssemblyOutcome {
                handles: Vec::new(),
                pages_fetched: 0,
                items_read: 0,
                failure: Some(format!("executor failed to start: {err}")),
            },
        };

        // Drain every accepted chunk before deciding the outcome
        executor.shutdown(true).await;
        for result in join_all(outcome.handles).await {
            context.record_chunk_result(result);
        }
        context.record_read_stats(outcome.pages_fetched, outcome.items_read);

        let event = match outcome.failure {
            Some(failure) => {
                context.record_failure(failure.clone());
                JobEvent::Fail(failure)
            }
            None if context.chunks_failed() > 0 => JobEvent::Fail(format!(
                "{} of {} chunks failed",
                context.chunks_failed(),
                context.chunks_processed()
            )),
            None => JobEvent::Complete,
        };
        let terminal = state_machine.transition(event)?;
        context.finish(terminal, executor.lifecycle());

        log_job!(
            info,
            "FINISHED",
            job_name: self.job.name(),
            run_id: context.run_id(),
            status: terminal,
            pages_fetched: context.pages_fetched(),
            items_written: context.items_written(),
            chunks_succeeded: context.chunks_succeeded(),
            chunks_failed: context.chunks_failed(),
            duration_ms: context.duration_ms()
        );
        self.job.listener().after_job(&context);

        Ok(context)
    }

    async fn assemble_and_submit(
        &self,
        executor: &ThrottledExecutor<R>,
        context: &JobExecutionContext,
    ) -> AssemblyOutcome {
        let reader = PagingReader::new(
            Arc::clone(self.job.source()),
            context.parameters().page_size,
            self.job.sort().clone(),
        );
        let mut assembler = ChunkAssembler::new(reader, context.parameters().chunk_size);
        let mut handles = Vec::new();

        let failure = loop {
            match assembler.next_chunk().await {
                Ok(Some(chunk)) => match executor.submit(chunk).await {
                    Ok(handle) => handles.push(handle),
                    Err(err) => break Some(format!("chunk submission rejected: {err}")),
                },
                Ok(None) => break None,
                Err(err) => {
                    error!(
                        run_id = context.run_id(),
                        chunks_submitted = handles.len(),
                        error = %err,
                        "Read failed, stopping chunk assembly"
                    );
                    break Some(format!("read failed: {err}"));
                }
            }
        };

        AssemblyOutcome {
            handles,
            pages_fetched: assembler.reader().pages_fetched(),
            items_read: assembler.reader().items_read(),
            failure,
        }
    }
}
