use std::time::Duration;

use apprank_config::{
    Config, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECONDS,
};
use apprank_utils::types::{FeatureCasing, ResponseFields};

/// Backoff unit between transport retries; attempt `n` waits `n` units.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Knobs the orchestrator reads for one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    /// Provider calls in flight at once. 1 runs them strictly in sequence.
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub feature_casing: FeatureCasing,
    /// Used when a system prompt does not carry its own mapping.
    pub response_fields: ResponseFields,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            feature_casing: FeatureCasing::default(),
            response_fields: ResponseFields::default(),
        }
    }
}

impl From<&Config> for ExecutionSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrency(),
            request_timeout: config.request_timeout(),
            max_retries: config.max_retries(),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            feature_casing: config.feature_casing(),
            response_fields: config.response.clone(),
        }
    }
}
