//! LLM provider gateway
//!
//! Every vendor implements [`LlmProvider`]; callers pick one by name through a
//! [`ProviderRegistry`] and never see vendor details. The only vendor shipped
//! is the OpenAI-compatible chat-completions API, registered as `"OpenAI"`.

pub(crate) mod http_client;
mod openai_backend;
mod registry;
mod types;

pub use apprank_utils::error::LlmError;
pub use http_client::redact_error_message;
pub use openai_backend::{DEFAULT_ENDPOINT, OpenAiProvider, PROVIDER_NAME as OPENAI};
pub use registry::{ProviderConstructor, ProviderRegistry};
pub use types::{CompletionRequest, LlmProvider, Message, ProviderSettings, Role};
