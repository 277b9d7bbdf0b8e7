//! OpenAI chat-completions provider
//!
//! Sends a system + user exchange with `response_format` set to the
//! experiment's schema and returns the first choice's content.

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{CompletionRequest, LlmProvider, Message, ProviderSettings, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Name the provider is registered under.
pub const PROVIDER_NAME: &str = "OpenAI";

/// Default OpenAI API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: HttpClient,
    endpoint: String,
    api_key: String,
}

impl OpenAiProvider {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key is empty or the
    /// HTTP client cannot be constructed.
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        if settings.api_key.trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "OpenAI API key is empty".to_string(),
            ));
        }
        let client = HttpClient::new(settings.max_retries, settings.retry_backoff)?;

        Ok(Self {
            client,
            endpoint: settings
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key: settings.api_key,
        })
    }

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                },
                content: msg.content.clone(),
            })
            .collect()
    }

    fn build_body(request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: Self::convert_messages(&request.messages()),
            response_format: request.schema.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn create_completion(&self, request: CompletionRequest) -> Result<String, LlmError> {
        debug!(
            provider = PROVIDER_NAME,
            model = %request.model,
            temperature = request.temperature,
            top_p = ?request.top_p,
            timeout_secs = request.timeout.as_secs(),
            "Requesting chat completion"
        );

        let body = Self::build_body(&request);
        let builder = self
            .client
            .inner()
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(builder, request.timeout, PROVIDER_NAME)
            .await?;

        let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::request_failed(PROVIDER_NAME, format!("failed to decode response: {e}"))
        })?;

        if let Some(usage) = &response_body.usage {
            debug!(
                provider = PROVIDER_NAME,
                tokens_input = usage.prompt_tokens,
                tokens_output = usage.completion_tokens,
                "Chat completion received"
            );
        }

        response_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::request_failed(PROVIDER_NAME, "Empty response"))
    }
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    response_format: Value,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
