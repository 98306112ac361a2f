use tracing::debug;

use super::errors::{StateMachineError, StateMachineResult};
use super::events::JobEvent;
use super::states::JobState;

/// In-memory state machine for a single job run
///
/// `NOT_STARTED -> RUNNING -> {COMPLETED, FAILED}`. Terminal states accept no
/// further events, which is what makes a finished run non-restartable.
#[derive(Debug, Clone)]
pub struct JobStateMachine {
    run_id: u64,
    current_state: JobState,
}

impl JobStateMachine {
    pub fn new(run_id: u64) -> Self {
        Self {
            run_id,
            current_state: JobState::NotStarted,
        }
    }

    pub fn current_state(&self) -> JobState {
        self.current_state
    }

    /// Apply an event, returning the new state
    pub fn transition(&mut self, event: JobEvent) -> StateMachineResult<JobState> {
        let target = Self::determine_target_state(self.current_state, &event)?;
        debug!(
            run_id = self.run_id,
            from = %self.current_state,
            to = %target,
            event = event.event_type(),
            reason = event.error_message(),
            "Job state transition"
        );
        self.current_state = target;
        Ok(target)
    }

    fn determine_target_state(current: JobState, event: &JobEvent) -> StateMachineResult<JobState> {
        match (current, event) {
            (JobState::NotStarted, JobEvent::Start) => Ok(JobState::Running),
            (JobState::Running, JobEvent::Complete) => Ok(JobState::Completed),
            (JobState::Running, JobEvent::Fail(_)) => Ok(JobState::Failed),
            (from, event) => Err(StateMachineError::InvalidTransition {
                from,
                event: event.event_type().to_string(),
            }),
        }
    }
}
