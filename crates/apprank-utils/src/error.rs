use std::fmt;
use thiserror::Error;

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;

    /// Render message, context and suggestions as a block suitable for stderr.
    fn display_for_user(&self) -> String {
        let mut out = format!("error[{}]: {}", self.category(), self.user_message());
        if let Some(context) = self.context() {
            out.push_str("\n  ");
            out.push_str(&context);
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str("\n  - ");
                out.push_str(&suggestion);
            }
        }
        out
    }
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    ProviderIntegration,
    Persistence,
    Security,
    Template,
    StateTransition,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Validation => write!(f, "Validation"),
            Self::ProviderIntegration => write!(f, "Provider Integration"),
            Self::Persistence => write!(f, "Persistence"),
            Self::Security => write!(f, "Security"),
            Self::Template => write!(f, "Template"),
            Self::StateTransition => write!(f, "State Transition"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {path}")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with optional [database], [execution], [llm], [security] and [response] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => Some(
                "Some values are required before apprank can talk to a provider or decrypt stored keys."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } => Some(
                "apprank searches for .apprank/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::DiscoveryFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Run 'apprank init' to write a fresh default configuration".to_string(),
            ],
            Self::MissingRequired(key) if key.contains("encryption") => vec![
                "Generate a key with 'apprank keygen'".to_string(),
                "Export it as APPRANK_ENCRYPTION_KEY before running apprank".to_string(),
            ],
            Self::MissingRequired(_) => {
                vec!["Check the documentation for required configuration options".to_string()]
            }
            Self::InvalidValue { key, .. } => match key.as_str() {
                "execution.max_concurrency" => {
                    vec!["Use a value between 1 and 64".to_string()]
                }
                "llm.timeout_seconds" => {
                    vec!["Use a timeout between 1 and 3600 seconds".to_string()]
                }
                "execution.feature_casing" => {
                    vec!["Use 'lowercase_first' or 'preserve'".to_string()]
                }
                _ => vec!["Check the documentation for valid values".to_string()],
            },
            Self::NotFound { path } => vec![
                format!("Check that {path} exists and is readable"),
                "Omit --config to fall back to discovery".to_string(),
            ],
            Self::DiscoveryFailed { .. } => {
                vec!["Pass an explicit --config path".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors raised by the LLM provider gateway.
///
/// Every vendor-side failure (network, auth, rate limit, 5xx, empty content)
/// collapses into [`LlmError::RequestFailed`]; the gateway does not classify
/// retryable versus fatal causes.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{provider} API request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} not supported. Available providers: {}", .available.join(", "))]
    NotImplemented {
        provider: String,
        available: Vec<String>,
    },

    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl LlmError {
    pub fn request_failed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::RequestFailed { provider, reason } => {
                format!("Request to {provider} failed: {reason}")
            }
            Self::NotImplemented {
                provider,
                available,
            } => format!(
                "Provider '{provider}' is not supported (available: {})",
                available.join(", ")
            ),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::RequestFailed { .. } => Some(
                "Network, authentication, rate-limit and empty-response failures are all reported this way."
                    .to_string(),
            ),
            Self::NotImplemented { .. } => {
                Some("LLM definitions name their provider; only registered providers can be called.".to_string())
            }
            Self::Misconfiguration(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::RequestFailed { .. } => vec![
                "Verify the stored API key is valid and not expired".to_string(),
                "Check the provider's status page and your rate limits".to_string(),
                "Retry the experiment with 'apprank experiment retry <id>'".to_string(),
            ],
            Self::NotImplemented { .. } => vec![
                "List registered providers with 'apprank providers'".to_string(),
                "Update the LLM with 'apprank llm update <id> --provider <name>'".to_string(),
            ],
            Self::Misconfiguration(_) => {
                vec!["Check the [llm] section of .apprank/config.toml".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::RequestFailed { .. } => ErrorCategory::ProviderIntegration,
            Self::NotImplemented { .. } | Self::Misconfiguration(_) => {
                ErrorCategory::Configuration
            }
        }
    }
}

/// Prompt rendering errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to render prompt template: {reason}")]
    Render { reason: String },
}

impl UserFriendlyError for TemplateError {
    fn user_message(&self) -> String {
        match self {
            Self::Render { reason } => format!("User prompt could not be rendered: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        Some("User prompts are Jinja templates receiving 'feature' and, when set, 'k'.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Check the template for unbalanced {{ }} or {% %} blocks".to_string(),
            "Inspect the stored text with 'apprank template show <id>'".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Template
    }
}

/// API-key encryption errors
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Encryption key is not set (expected in environment variable {env})")]
    MissingKey { env: String },

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Ciphertext is malformed or was produced with a different key")]
    InvalidToken,

    #[error("Encryption failed: {0}")]
    Encrypt(String),
}

impl UserFriendlyError for SecretError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some("API keys are stored encrypted and decrypted just before a provider call.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::MissingKey { env } => vec![
                "Generate a key with 'apprank keygen'".to_string(),
                format!("Export it as {env}"),
            ],
            Self::InvalidKey(_) => {
                vec!["Keys are 32 random bytes encoded as standard base64".to_string()]
            }
            Self::InvalidToken => vec![
                "Make sure the same key is used that stored the API key".to_string(),
                "Re-enter the API key with 'apprank llm update <id> --api-key ...'".to_string(),
            ],
            Self::Encrypt(_) => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Security
    }
}
