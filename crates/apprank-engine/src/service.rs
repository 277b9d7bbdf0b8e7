//! Request-level operations: creating and retrying experiments, and keeping
//! API keys encrypted on their way into the store.

use apprank_store::{Experiment, Llm, LlmUpdate, NewExperiment, NewLlm, Store};
use apprank_utils::types::ExperimentStatus;
use serde::Serialize;
use tracing::info;

use crate::error::AppRankError;
use crate::orchestrator::{ExperimentExecutor, RunSummary};
use crate::state::ExperimentStateContext;

/// Result of a successful execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub experiment: Experiment,
    pub num_runs: u32,
    pub runs: Vec<RunSummary>,
}

#[derive(Debug, Clone)]
pub struct ExperimentService {
    executor: ExperimentExecutor,
}

impl ExperimentService {
    #[must_use]
    pub fn new(executor: ExperimentExecutor) -> Self {
        Self { executor }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        self.executor.store()
    }

    #[must_use]
    pub fn executor(&self) -> &ExperimentExecutor {
        &self.executor
    }

    /// Create an experiment and run it immediately.
    ///
    /// The experiment row is written first, in the RUNNING state. If execution
    /// then fails, the row stays behind as FAILED and the error is returned.
    ///
    /// # Errors
    ///
    /// Validation errors for an empty name or `num_runs == 0`; store errors
    /// for unknown references or a taken name; any execution error.
    pub async fn create_and_execute(
        &self,
        request: &NewExperiment,
    ) -> Result<ExperimentReport, AppRankError> {
        if request.name.trim().is_empty() {
            return Err(AppRankError::validation("Experiment name must not be empty."));
        }
        if request.num_runs < 1 {
            return Err(AppRankError::validation("num_runs must be at least 1."));
        }

        let mut experiment = self.store().create_experiment(request)?;
        info!(
            experiment_id = experiment.id,
            name = %experiment.name,
            models = experiment.configured_model_ids.len(),
            num_runs = experiment.num_runs,
            "Experiment created"
        );

        let runs = self.executor.execute(&mut experiment).await?;
        Ok(ExperimentReport {
            num_runs: experiment.num_runs,
            experiment,
            runs,
        })
    }

    /// Move a FAILED experiment back to RUNNING and execute it again.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the experiment is FAILED; otherwise as
    /// [`ExperimentExecutor::execute`].
    pub async fn retry(&self, experiment_id: i64) -> Result<ExperimentReport, AppRankError> {
        let mut experiment = self.store().get_experiment(experiment_id)?;
        let previous = experiment.status.clone();
        if !ExperimentStateContext::new(&mut experiment)?.transition_to_running() {
            return Err(AppRankError::InvalidTransition {
                id: experiment_id,
                status: previous,
                action: "retry",
            });
        }
        self.store()
            .update_experiment_status(experiment_id, ExperimentStatus::Running)?;

        let runs = self.executor.execute(&mut experiment).await?;
        Ok(ExperimentReport {
            num_runs: experiment.num_runs,
            experiment,
            runs,
        })
    }

    /// Store an LLM with its API key encrypted.
    pub fn create_llm(&self, new: &NewLlm) -> Result<Llm, AppRankError> {
        let encrypted = NewLlm {
            api_key: self.executor.cipher().encrypt(&new.api_key)?,
            ..new.clone()
        };
        Ok(self.store().create_llm(&encrypted)?)
    }

    /// Update an LLM, encrypting a replacement API key.
    pub fn update_llm(&self, id: i64, update: &LlmUpdate) -> Result<Llm, AppRankError> {
        let api_key = update
            .api_key
            .as_deref()
            .map(|key| self.executor.cipher().encrypt(key))
            .transpose()?;
        let update = LlmUpdate {
            api_key,
            ..update.clone()
        };
        Ok(self.store().update_llm(id, &update)?)
    }

    /// Decrypted API key of an LLM.
    pub fn reveal_api_key(&self, id: i64) -> Result<String, AppRankError> {
        let llm = self.store().get_llm(id)?;
        Ok(self.executor.cipher().decrypt(&llm.api_key)?)
    }
}
