//! Job lifecycle callbacks.

use crate::log_job;
use crate::models::JobExecutionContext;

/// Receives the two lifecycle events of a job run
///
/// Both callbacks run synchronously on the controller task. `after_job` is
/// invoked for every run that started, whatever its final status, and only
/// after the executor has terminated.
pub trait JobExecutionListener: Send + Sync {
    fn before_job(&self, _context: &JobExecutionContext) {}

    fn after_job(&self, _context: &JobExecutionContext) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl JobExecutionListener for NoopListener {}

/// Logs the start and outcome of each run
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl JobExecutionListener for LoggingListener {
    fn before_job(&self, context: &JobExecutionContext) {
        log_job!(
            info,
            "BEFORE",
            job_name: context.job_name(),
            run_id: context.run_id(),
            execution_id: context.execution_id()
        );
    }

    fn after_job(&self, context: &JobExecutionContext) {
        log_job!(
            info,
            "AFTER",
            job_name: context.job_name(),
            run_id: context.run_id(),
            status: context.status(),
            chunks_succeeded: context.chunks_succeeded(),
            chunks_failed: context.chunks_failed(),
            executor_lifecycle: context.executor_lifecycle()
        );
    }
}
