//! Experiment lifecycle state machine
//!
//! ```text
//!   RUNNING ──complete──▶ COMPLETED
//!      │  ▲
//!    fail│  │retry
//!      ▼  │
//!    FAILED
//! ```
//!
//! Transitions are decided by [`next_status`], a pure function of the current
//! and requested status. [`ExperimentStateContext`] applies the decision to an
//! [`Experiment`] held in memory and emits diagnostic events. It never writes
//! to the store; callers persist the new status themselves, alone or together
//! with other writes.

use apprank_store::Experiment;
use apprank_utils::types::ExperimentStatus;
use tracing::{debug, info, warn};

use crate::error::StateError;

/// `Some(to)` if moving from `from` to `to` is allowed.
#[must_use]
pub fn next_status(from: ExperimentStatus, to: ExperimentStatus) -> Option<ExperimentStatus> {
    use ExperimentStatus::{Completed, Failed, Running};
    match (from, to) {
        (Running, Completed) | (Running, Failed) | (Failed, Running) => Some(to),
        _ => None,
    }
}

/// Parse a persisted status string.
pub fn parse_status(status: &str) -> Result<ExperimentStatus, StateError> {
    ExperimentStatus::parse(status).ok_or_else(|| StateError::UnknownStatus {
        status: status.to_string(),
    })
}

/// Drives the status of one experiment.
///
/// The state is read from `experiment.status` when the context is built, so
/// a context never outlives a change it didn't make.
#[derive(Debug)]
pub struct ExperimentStateContext<'a> {
    experiment: &'a mut Experiment,
    state: ExperimentStatus,
}

impl<'a> ExperimentStateContext<'a> {
    /// # Errors
    ///
    /// Returns `StateError::UnknownStatus` if the stored status is not a
    /// known state.
    pub fn new(experiment: &'a mut Experiment) -> Result<Self, StateError> {
        let state = parse_status(&experiment.status)?;
        Ok(Self { experiment, state })
    }

    #[must_use]
    pub fn state(&self) -> ExperimentStatus {
        self.state
    }

    /// FAILED → RUNNING.
    pub fn transition_to_running(&mut self) -> bool {
        self.transition(ExperimentStatus::Running)
    }

    /// RUNNING → COMPLETED.
    pub fn transition_to_completed(&mut self) -> bool {
        self.transition(ExperimentStatus::Completed)
    }

    /// RUNNING → FAILED.
    pub fn transition_to_failed(&mut self) -> bool {
        self.transition(ExperimentStatus::Failed)
    }

    fn transition(&mut self, target: ExperimentStatus) -> bool {
        let Some(next) = next_status(self.state, target) else {
            warn!(
                experiment_id = self.experiment.id,
                from = %self.state,
                to = %target,
                "Rejected experiment status transition"
            );
            return false;
        };

        self.on_exit(self.state);
        self.state = next;
        self.experiment.status = next.as_str().to_string();
        self.on_enter(next);
        true
    }

    fn on_exit(&self, state: ExperimentStatus) {
        debug!(experiment_id = self.experiment.id, state = %state, "Leaving state");
    }

    fn on_enter(&self, state: ExperimentStatus) {
        let id = self.experiment.id;
        let name = self.experiment.name.as_str();
        match state {
            ExperimentStatus::Running => {
                info!(experiment_id = id, experiment = name, "Experiment running");
            }
            ExperimentStatus::Completed => {
                info!(experiment_id = id, experiment = name, "Experiment completed");
            }
            ExperimentStatus::Failed => {
                warn!(experiment_id = id, experiment = name, "Experiment failed");
            }
        }
    }
}
