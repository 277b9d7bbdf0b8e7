//! Error taxonomy for experiment execution.
//!
//! [`AppRankError`] is what the engine returns. Library callers can match on
//! it directly; the CLI uses [`AppRankError::to_exit_code`] and
//! [`AppRankError::kind`] to report it.

use apprank_store::StoreError;
use apprank_utils::error::{
    ConfigError, ErrorCategory, LlmError, SecretError, TemplateError, UserFriendlyError,
};
use apprank_utils::exit_codes::ExitCode;
use apprank_utils::types::ErrorKind;
use thiserror::Error;

/// Failures of the experiment state machine itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The stored status string is not a known state. Indicates corrupted or
    /// foreign data rather than a user mistake.
    #[error("Unknown experiment status '{status}'")]
    UnknownStatus { status: String },
}

#[derive(Error, Debug)]
pub enum AppRankError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid JSON response from LLM: {0}")]
    InvalidResponse(String),

    #[error("Cannot {action} experiment {id}: status is {status}")]
    InvalidTransition {
        id: i64,
        status: String,
        action: &'static str,
    },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppRankError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Machine-readable kind, also used for exit codes.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidResponse(_) | Self::Template(_) => {
                ErrorKind::Validation
            }
            Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::Llm(LlmError::RequestFailed { .. }) => ErrorKind::ProviderFailure,
            Self::Llm(_) => ErrorKind::Validation,
            Self::Secret(SecretError::Encrypt(_)) => ErrorKind::Internal,
            Self::Secret(_) | Self::Config(_) => ErrorKind::CliArgs,
            Self::Store(StoreError::NotFound { .. } | StoreError::NameNotFound { .. }) => {
                ErrorKind::NotFound
            }
            Self::Store(StoreError::Conflict { .. } | StoreError::Protected { .. }) => {
                ErrorKind::Conflict
            }
            Self::Store(_) | Self::State(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.kind())
    }

    /// The caller's request was at fault; retrying it unchanged won't help.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.to_exit_code().is_client_error()
    }
}

impl UserFriendlyError for AppRankError {
    fn user_message(&self) -> String {
        match self {
            Self::Llm(e) => e.user_message(),
            Self::Template(e) => e.user_message(),
            Self::Secret(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            Self::Config(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Llm(e) => e.context(),
            Self::Template(e) => e.context(),
            Self::Secret(e) => e.context(),
            Self::Store(e) => e.context(),
            Self::Config(e) => e.context(),
            Self::InvalidResponse(_) => Some(
                "Responses must be a JSON object (or a JSON string holding one) with the configured app and criteria keys."
                    .to_string(),
            ),
            Self::InvalidTransition { .. } => Some(
                "Experiments run once; only failed experiments can be retried.".to_string(),
            ),
            Self::State(_) => Some("The experiment row holds a status apprank does not know.".to_string()),
            Self::Validation(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Llm(e) => e.suggestions(),
            Self::Template(e) => e.suggestions(),
            Self::Secret(e) => e.suggestions(),
            Self::Store(e) => e.suggestions(),
            Self::Config(e) => e.suggestions(),
            Self::InvalidResponse(_) => vec![
                "Check that the system prompt's schema matches [response] in the config".to_string(),
            ],
            Self::InvalidTransition { .. } => {
                vec!["Inspect the experiment with 'apprank experiment show <id>'".to_string()]
            }
            Self::Validation(_) | Self::State(_) => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Llm(e) => e.category(),
            Self::Template(e) => e.category(),
            Self::Secret(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Config(e) => e.category(),
            Self::Validation(_) | Self::InvalidResponse(_) => ErrorCategory::Validation,
            Self::InvalidTransition { .. } | Self::State(_) => ErrorCategory::StateTransition,
        }
    }
}
