//! Core types for the provider abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One structured-output completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model name as the vendor knows it.
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Structured-output format sent as `response_format`.
    pub schema: Value,
    pub temperature: f64,
    /// Nucleus-sampling override. `None` leaves the vendor default in place.
    pub top_p: Option<f64>,
    pub timeout: Duration,
}

impl CompletionRequest {
    /// The system + user exchange sent to the vendor.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user(self.user_prompt.clone()),
        ]
    }
}

/// Everything a provider constructor receives.
#[derive(Clone)]
pub struct ProviderSettings {
    /// Decrypted API key.
    pub api_key: String,
    /// Endpoint override; `None` uses the vendor default.
    pub endpoint: Option<String>,
    /// Transport retries for 5xx and network failures.
    pub max_retries: u32,
    /// Base delay between retries; grows linearly with the attempt number.
    pub retry_backoff: Duration,
}

impl ProviderSettings {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: None,
            max_retries: 2,
            retry_backoff: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

/// A chat-completion vendor.
///
/// Implementations return the text content of the first choice, or
/// [`LlmError::RequestFailed`] for any failure including empty content.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Name the provider is registered under.
    fn name(&self) -> &str;

    async fn create_completion(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_are_system_then_user() {
        let request = CompletionRequest {
            model: "gpt-4o".to_string(),
            system_prompt: "rank apps".to_string(),
            user_prompt: "Analyze search".to_string(),
            schema: json!({"type": "json_object"}),
            temperature: 0.0,
            top_p: None,
            timeout: Duration::from_secs(5),
        };
        let messages = request.messages();
        assert_eq!(messages[0], Message::system("rank apps"));
        assert_eq!(messages[1], Message::user("Analyze search"));
        assert_eq!(
            serde_json::to_value(&messages[1]).unwrap(),
            json!({"role": "user", "content": "Analyze search"})
        );
    }

    #[test]
    fn settings_debug_hides_api_key() {
        let settings = ProviderSettings::new("sk-very-secret");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
