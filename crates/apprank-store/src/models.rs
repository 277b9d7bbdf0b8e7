//! Records read from and written to the store.
//!
//! `New*` structs are inputs; the rest mirror table rows. Inputs deserialize
//! from JSON so the CLI can accept them from files.

use apprank_utils::types::ResponseFields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-p value that means "no override".
pub const NEUTRAL_TOP_P: f64 = 1.0;

/// Name stored for criteria the response left unnamed.
pub const UNNAMED_CRITERION: &str = "Unnamed Criterion";

// ===== LLMs and sampling =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Llm {
    pub id: i64,
    /// Model name sent to the provider.
    pub name: String,
    pub provider: String,
    /// Ciphertext token, never the plaintext key.
    pub api_key: String,
    pub api_endpoint: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLlm {
    pub name: String,
    pub provider: String,
    pub api_key: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

/// Partial update; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmUpdate {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub api_key: Option<String>,
    /// `Some(None)` clears the override.
    pub api_endpoint: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: i64,
    pub name: String,
    pub temperature: f64,
    pub top_p: f64,
}

impl Configuration {
    /// Top-p to send to the provider, `None` when it is the neutral value.
    #[must_use]
    pub fn top_p_override(&self) -> Option<f64> {
        if (self.top_p - NEUTRAL_TOP_P).abs() < f64::EPSILON {
            None
        } else {
            Some(self.top_p)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConfiguration {
    pub name: String,
    pub temperature: f64,
    #[serde(default)]
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationUpdate {
    pub name: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredModel {
    pub id: i64,
    pub llm_id: i64,
    pub configuration_id: i64,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConfiguredModel {
    pub llm_id: i64,
    pub configuration_id: i64,
    pub short_name: String,
}

/// A configured model joined with its LLM and sampling configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfiguredModelDetail {
    pub model: ConfiguredModel,
    pub llm: Llm,
    pub configuration: Configuration,
}

// ===== Prompt templates =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPrompt {
    pub id: i64,
    pub text: String,
    pub schema: Value,
    pub response_fields: Option<ResponseFields>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPrompt {
    pub id: i64,
    pub text: String,
    pub k: Option<i64>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub user_prompt_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: i64,
    pub name: String,
    pub system_prompt: SystemPrompt,
    pub user_prompt: UserPrompt,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSystemPrompt {
    pub text: String,
    pub schema: Value,
    #[serde(default)]
    pub response_fields: Option<ResponseFields>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeature {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUserPrompt {
    pub text: String,
    #[serde(default)]
    pub k: Option<i64>,
    #[serde(default)]
    pub features: Vec<NewFeature>,
}

/// A template with its two prompts and the features under test, created in
/// one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPromptTemplate {
    pub name: String,
    pub system_prompt: NewSystemPrompt,
    pub user_prompt: NewUserPrompt,
}

// ===== Experiments and results =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: i64,
    pub name: String,
    pub prompt_template_id: i64,
    pub configured_model_ids: Vec<i64>,
    pub num_runs: u32,
    /// Persisted status string; the engine parses it into a state.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExperiment {
    pub name: String,
    pub prompt_template_id: i64,
    pub configured_model_ids: Vec<i64>,
    pub num_runs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub experiment_id: i64,
    pub configured_model_id: i64,
    pub feature_id: i64,
    /// Wall-clock seconds spent on the provider call.
    pub elapsed_time: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileApp {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileAppRanked {
    pub mobile_app_id: i64,
    pub app_name: String,
    pub run_id: i64,
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingCriteria {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub run_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCriterion {
    pub name: String,
    pub description: String,
}

impl Default for NewCriterion {
    fn default() -> Self {
        Self {
            name: UNNAMED_CRITERION.to_string(),
            description: String::new(),
        }
    }
}

/// Everything one provider call produced, ready to be written.
///
/// `apps` must already be de-duplicated; ranks are assigned by position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub configured_model_id: i64,
    pub feature_id: i64,
    pub elapsed_time: f64,
    pub apps: Vec<String>,
    pub criteria: Vec<NewCriterion>,
}
