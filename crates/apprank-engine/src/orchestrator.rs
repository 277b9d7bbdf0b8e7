//! Experiment execution
//!
//! For each configured model, for each feature of the template's user
//! prompt, `num_runs` completions are requested. Calls run through an ordered
//! buffered stream, so at most `max_concurrency` are in flight and results
//! keep (model, feature, repetition) order. The first failure stops the
//! stream and drops the calls still in flight.
//!
//! Nothing is written until every call has succeeded. Then all runs, their
//! ranked apps and criteria, and the COMPLETED status are committed in one
//! transaction. On any failure the experiment is marked FAILED in a separate
//! write, so the failure survives even though no results were kept.

use std::sync::Arc;
use std::time::Instant;

use apprank_llm::{CompletionRequest, LlmProvider, ProviderRegistry, ProviderSettings};
use apprank_prompt_template::PromptRenderer;
use apprank_secrets::KeyCipher;
use apprank_store::{Experiment, PromptTemplate, RunOutcome, Store};
use apprank_utils::logging::{completion_span, experiment_span};
use apprank_utils::types::{ExperimentStatus, ResponseFields};
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, debug, error, info};

use crate::error::AppRankError;
use crate::response::parse_response;
use crate::settings::ExecutionSettings;
use crate::state::ExperimentStateContext;

pub const NO_CONFIGURED_MODELS: &str = "No configured models found for this experiment.";
pub const NO_FEATURES: &str = "No features defined for this prompt template.";

/// What one repetition produced, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: i64,
    /// Seconds spent waiting on the provider.
    pub elapsed_time: f64,
    pub feature_id: i64,
}

/// A configured model ready to be called.
struct ModelHandle {
    configured_model_id: i64,
    short_name: String,
    model_name: String,
    temperature: f64,
    top_p: Option<f64>,
    provider: Arc<dyn LlmProvider>,
}

struct CompletionJob {
    model: Arc<ModelHandle>,
    feature_id: i64,
    feature_name: String,
    user_prompt: Arc<str>,
    repetition: u32,
}

/// Runs experiments against their configured models.
#[derive(Debug, Clone)]
pub struct ExperimentExecutor {
    store: Store,
    registry: ProviderRegistry,
    cipher: KeyCipher,
    settings: ExecutionSettings,
}

impl ExperimentExecutor {
    #[must_use]
    pub fn new(
        store: Store,
        registry: ProviderRegistry,
        cipher: KeyCipher,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            store,
            registry,
            cipher,
            settings,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    #[must_use]
    pub fn cipher(&self) -> &KeyCipher {
        &self.cipher
    }

    #[must_use]
    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Execute a RUNNING experiment to completion.
    ///
    /// On success `experiment.status` is `completed` and one summary is
    /// returned per run, in (model, feature, repetition) order. On failure
    /// the experiment has been moved to FAILED (in memory and in the store)
    /// unless it was already terminal, and the error is returned.
    pub async fn execute(
        &self,
        experiment: &mut Experiment,
    ) -> Result<Vec<RunSummary>, AppRankError> {
        let span = experiment_span(experiment.id, &experiment.name);
        async {
            match self.try_execute(experiment).await {
                Ok(summaries) => Ok(summaries),
                Err(err) => {
                    error!(
                        experiment_id = experiment.id,
                        error = %err,
                        "Experiment execution failed"
                    );
                    self.mark_failed(experiment);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_execute(
        &self,
        experiment: &mut Experiment,
    ) -> Result<Vec<RunSummary>, AppRankError> {
        let state = ExperimentStateContext::new(experiment)?.state();
        if state != ExperimentStatus::Running {
            return Err(AppRankError::InvalidTransition {
                id: experiment.id,
                status: experiment.status.clone(),
                action: "execute",
            });
        }

        if experiment.configured_model_ids.is_empty() {
            return Err(AppRankError::validation(NO_CONFIGURED_MODELS));
        }
        let template = self.store.get_template(experiment.prompt_template_id)?;
        if template.user_prompt.features.is_empty() {
            return Err(AppRankError::validation(NO_FEATURES));
        }

        let jobs = self.plan(experiment, &template)?;
        info!(
            experiment_id = experiment.id,
            calls = jobs.len(),
            max_concurrency = self.settings.max_concurrency,
            "Starting provider calls"
        );

        let fields = template
            .system_prompt
            .response_fields
            .clone()
            .unwrap_or_else(|| self.settings.response_fields.clone());
        let system_prompt = template.system_prompt.text.as_str();
        let schema = &template.system_prompt.schema;

        let outcomes: Vec<RunOutcome> = stream::iter(jobs)
            .map(|job| self.complete(job, system_prompt, schema, &fields))
            .buffered(self.settings.max_concurrency.max(1))
            .try_collect()
            .await?;

        let previous = experiment.status.clone();
        if !ExperimentStateContext::new(experiment)?.transition_to_completed() {
            return Err(AppRankError::InvalidTransition {
                id: experiment.id,
                status: previous,
                action: "complete",
            });
        }

        let run_ids = match self.store.commit_experiment_results(
            experiment.id,
            &outcomes,
            ExperimentStatus::Completed,
        ) {
            Ok(run_ids) => run_ids,
            Err(err) => {
                // Nothing was committed; the stored status is still the old one.
                experiment.status = previous;
                return Err(err.into());
            }
        };

        Ok(run_ids
            .into_iter()
            .zip(outcomes)
            .map(|(run_id, outcome)| RunSummary {
                run_id,
                elapsed_time: outcome.elapsed_time,
                feature_id: outcome.feature_id,
            })
            .collect())
    }

    /// Resolve providers and render prompts, one job per planned call.
    fn plan(
        &self,
        experiment: &Experiment,
        template: &PromptTemplate,
    ) -> Result<Vec<CompletionJob>, AppRankError> {
        let renderer = PromptRenderer::new(self.settings.feature_casing);
        let mut jobs = Vec::new();

        for model_id in &experiment.configured_model_ids {
            let detail = self.store.get_configured_model_detail(*model_id)?;
            let api_key = self.cipher.decrypt(&detail.llm.api_key)?;
            let settings = ProviderSettings::new(api_key)
                .with_endpoint(detail.llm.api_endpoint.clone())
                .with_retries(self.settings.max_retries, self.settings.retry_backoff);
            let provider: Arc<dyn LlmProvider> =
                Arc::from(self.registry.create(&detail.llm.provider, settings)?);

            let model = Arc::new(ModelHandle {
                configured_model_id: detail.model.id,
                short_name: detail.model.short_name.clone(),
                model_name: detail.llm.name.clone(),
                temperature: detail.configuration.temperature,
                top_p: detail.configuration.top_p_override(),
                provider,
            });

            for feature in &template.user_prompt.features {
                let user_prompt: Arc<str> = renderer
                    .render(&template.user_prompt.text, &feature.name, template.user_prompt.k)?
                    .into();
                for repetition in 1..=experiment.num_runs {
                    jobs.push(CompletionJob {
                        model: Arc::clone(&model),
                        feature_id: feature.id,
                        feature_name: feature.name.clone(),
                        user_prompt: Arc::clone(&user_prompt),
                        repetition,
                    });
                }
            }
        }
        Ok(jobs)
    }

    async fn complete(
        &self,
        job: CompletionJob,
        system_prompt: &str,
        schema: &Value,
        fields: &ResponseFields,
    ) -> Result<RunOutcome, AppRankError> {
        let span = completion_span(&job.model.short_name, &job.feature_name, job.repetition);
        async {
            let request = CompletionRequest {
                model: job.model.model_name.clone(),
                system_prompt: system_prompt.to_string(),
                user_prompt: job.user_prompt.to_string(),
                schema: schema.clone(),
                temperature: job.model.temperature,
                top_p: job.model.top_p,
                timeout: self.settings.request_timeout,
            };

            let started = Instant::now();
            let content = job.model.provider.create_completion(request).await?;
            let elapsed_time = started.elapsed().as_secs_f64();

            let parsed = parse_response(&content, fields)?;
            debug!(
                apps = parsed.apps.len(),
                criteria = parsed.criteria.len(),
                elapsed_secs = elapsed_time,
                "Completion parsed"
            );

            Ok(RunOutcome {
                configured_model_id: job.model.configured_model_id,
                feature_id: job.feature_id,
                elapsed_time,
                apps: parsed.apps,
                criteria: parsed.criteria,
            })
        }
        .instrument(span)
        .await
    }

    fn mark_failed(&self, experiment: &mut Experiment) {
        let mut context = match ExperimentStateContext::new(experiment) {
            Ok(context) => context,
            Err(err) => {
                error!(experiment_id = experiment.id, error = %err, "Cannot mark experiment failed");
                return;
            }
        };
        if !context.transition_to_failed() {
            return;
        }
        if let Err(err) = self
            .store
            .update_experiment_status(experiment.id, ExperimentStatus::Failed)
        {
            error!(
                experiment_id = experiment.id,
                error = %err,
                "Failed to persist FAILED status"
            );
        }
    }
}
