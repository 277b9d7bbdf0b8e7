//! apprank - repeatable LLM app-ranking experiments
//!
//! apprank asks one or more configured LLMs to rank mobile apps for each
//! feature of a prompt template, repeats every question `num_runs` times, and
//! stores each run with its ranked apps and ranking criteria in SQLite.
//!
//! apprank can be used in two ways:
//! - **CLI**: `apprank init`, register LLMs and templates, then
//!   `apprank experiment create ...`
//! - **Library**: build an [`ExperimentService`] over a [`Store`], a
//!   [`ProviderRegistry`] and a [`KeyCipher`]
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use apprank::{
//!     ExecutionSettings, ExperimentExecutor, ExperimentService, KeyCipher, NewExperiment,
//!     ProviderRegistry, Store,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open(".apprank/apprank.db")?;
//! let cipher = KeyCipher::from_env("APPRANK_ENCRYPTION_KEY")?;
//! let service = ExperimentService::new(ExperimentExecutor::new(
//!     store,
//!     ProviderRegistry::default(),
//!     cipher,
//!     ExecutionSettings::default(),
//! ));
//!
//! let report = service
//!     .create_and_execute(&NewExperiment {
//!         name: "baseline".to_string(),
//!         prompt_template_id: 1,
//!         configured_model_ids: vec![1, 2],
//!         num_runs: 5,
//!     })
//!     .await?;
//! println!("{} runs stored", report.runs.len());
//! # Ok(())
//! # }
//! ```
//!
//! Every failure during execution leaves the experiment FAILED with no runs;
//! [`ExperimentService::retry`] executes a failed experiment again.

pub mod cli;

// Configuration: discovery, builder and effective values.
pub use apprank_config::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CliArgs, Config, ConfigBuilder, ConfigSource,
};

// Experiment execution.
pub use apprank_engine::{
    AppRankError, ExecutionSettings, ExperimentExecutor, ExperimentReport, ExperimentService,
    ExperimentStateContext, RunSummary, StateError,
};

// Provider gateway.
pub use apprank_llm::{CompletionRequest, LlmProvider, ProviderRegistry, ProviderSettings};

pub use apprank_secrets::KeyCipher;

// Persistence and the records it stores.
pub use apprank_store::{
    Configuration, ConfigurationUpdate, ConfiguredModel, Experiment, Feature, Llm, LlmUpdate,
    MobileApp, MobileAppRanked, NewConfiguration, NewConfiguredModel, NewExperiment, NewFeature,
    NewLlm, NewPromptTemplate, NewSystemPrompt, NewUserPrompt, PromptTemplate, RankingCriteria,
    Run, Store, StoreError,
};

pub use apprank_utils::exit_codes::ExitCode;
pub use apprank_utils::types::{ExperimentStatus, FeatureCasing, ResponseFields};

#[doc(hidden)]
pub use apprank_secrets as secrets;
#[doc(hidden)]
pub use apprank_utils::{error, logging};
