//! Job registry and the `run_job` entry point.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::controller::JobController;
use super::definition::Job;
use super::repository::JobRepository;
use crate::error::{BatchError, BatchResult};
use crate::log_job;
use crate::models::{JobExecutionContext, JobParameters, Record};

/// Hands out strictly increasing `run.id` values, starting at 1
#[derive(Debug)]
pub struct RunIdIncrementer {
    next: AtomicU64,
}

impl RunIdIncrementer {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Assign the next run id, replacing any caller-supplied one
    pub fn next_parameters(&self, parameters: JobParameters) -> JobParameters {
        JobParameters {
            run_id: Some(self.next.fetch_add(1, Ordering::SeqCst)),
            ..parameters
        }
    }
}

impl Default for RunIdIncrementer {
    fn default() -> Self {
        Self::new()
    }
}

/// Registered jobs plus the repository their executions are recorded in
pub struct JobLauncher<R: Record> {
    jobs: DashMap<String, Arc<Job<R>>>,
    repository: Arc<JobRepository>,
    incrementer: RunIdIncrementer,
}

impl<R: Record> JobLauncher<R> {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(JobRepository::new()))
    }

    pub fn with_repository(repository: Arc<JobRepository>) -> Self {
        Self {
            jobs: DashMap::new(),
            repository,
            incrementer: RunIdIncrementer::new(),
        }
    }

    pub fn register(&self, job: Job<R>) -> BatchResult<()> {
        let name = job.name().to_string();
        match self.jobs.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(BatchError::InvalidParameter(
                format!("job '{name}' is already registered"),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(job));
                Ok(())
            }
        }
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn repository(&self) -> &Arc<JobRepository> {
        &self.repository
    }

    /// Run a registered job to completion
    ///
    /// Every call is a new, independent run with a fresh run id, reader and
    /// executor, even when `parameters` repeat an earlier call.
    pub async fn run_job(
        &self,
        job_name: &str,
        parameters: JobParameters,
    ) -> BatchResult<JobExecutionContext> {
        let job = self
            .jobs
            .get(job_name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BatchError::JobNotFound(job_name.to_string()))?;

        parameters.validate()?;
        let parameters = self.incrementer.next_parameters(parameters);
        let context = self.repository.create_execution(job_name, parameters)?;
        log_job!(
            debug,
            "LAUNCHED",
            job_name: job_name,
            run_id: context.run_id(),
            parameters: context.parameters().to_identifying_map()
        );

        let finished = JobController::new(job)
            .with_repository(Arc::clone(&self.repository))
            .execute(context)
            .await?;
        self.repository.update(&finished);
        Ok(finished)
    }
}

impl<R: Record> Default for JobLauncher<R> {
    fn default() -> Self {
        Self::new()
    }
}
