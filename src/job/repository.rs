//! In-memory record of job executions.

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::{BatchError, BatchResult};
use crate::models::{JobExecutionContext, JobParameters};

/// Every execution the launcher has created, keyed by run id
///
/// Finished executions are kept for inspection but can never be restarted.
#[derive(Debug, Default)]
pub struct JobRepository {
    executions: DashMap<u64, JobExecutionContext>,
    latest_by_job: DashMap<String, u64>,
}

impl JobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a `NOT_STARTED` execution for an assigned run id
    pub fn create_execution(
        &self,
        job_name: &str,
        parameters: JobParameters,
    ) -> BatchResult<JobExecutionContext> {
        let run_id = parameters.run_id.ok_or_else(|| {
            BatchError::InvalidParameter("run id must be assigned before execution".to_string())
        })?;

        let context = JobExecutionContext::new(job_name, parameters, run_id);
        match self.executions.entry(run_id) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                return Err(BatchError::InvalidState(format!(
                    "run id {run_id} is already used by job '{}'",
                    existing.get().job_name()
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(context.clone());
            }
        }

        self.latest_by_job
            .entry(job_name.to_string())
            .and_modify(|latest| *latest = (*latest).max(run_id))
            .or_insert(run_id);

        debug!(job_name, run_id, "Job execution created");
        Ok(context)
    }

    /// Store the current state of an execution
    pub fn update(&self, context: &JobExecutionContext) {
        if let Some(existing) = self.executions.get(&context.run_id()) {
            if existing.is_terminal() {
                warn!(
                    run_id = context.run_id(),
                    "Ignoring update to a finished job execution"
                );
                return;
            }
        }
        self.executions.insert(context.run_id(), context.clone());
    }

    pub fn get(&self, run_id: u64) -> Option<JobExecutionContext> {
        self.executions.get(&run_id).map(|entry| entry.value().clone())
    }

    /// Most recent execution of a job, by run id
    pub fn last_execution(&self, job_name: &str) -> Option<JobExecutionContext> {
        let run_id = *self.latest_by_job.get(job_name)?;
        self.get(run_id)
    }

    /// All executions of a job ordered by run id
    pub fn executions_for(&self, job_name: &str) -> Vec<JobExecutionContext> {
        let mut executions: Vec<_> = self
            .executions
            .iter()
            .filter(|entry| entry.value().job_name() == job_name)
            .map(|entry| entry.value().clone())
            .collect();
        executions.sort_by_key(JobExecutionContext::run_id);
        executions
    }

    /// Attempt to resume an earlier run
    ///
    /// Always refused: a finished run is never resumed, and a run that has
    /// not finished is still owned by its controller. Start a new run with a
    /// fresh run id instead.
    pub fn restart(&self, run_id: u64) -> BatchResult<JobExecutionContext> {
        let context = self
            .get(run_id)
            .ok_or_else(|| BatchError::JobNotFound(format!("no execution with run id {run_id}")))?;

        if context.is_terminal() {
            warn!(run_id, status = %context.status(), "Restart prevented for finished execution");
            return Err(BatchError::RestartPrevented {
                run_id,
                status: context.status().to_string(),
            });
        }

        Err(BatchError::InvalidState(format!(
            "run {run_id} is {} and cannot be restarted",
            context.status()
        )))
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
