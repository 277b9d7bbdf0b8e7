use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an experiment as persisted in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Running,
    Completed,
    Failed,
}

impl ExperimentStatus {
    pub const ALL: [ExperimentStatus; 3] = [Self::Running, Self::Completed, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a persisted status string. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error kinds reported in machine-readable CLI output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CliArgs,
    Validation,
    NotFound,
    Conflict,
    ProviderFailure,
    Internal,
}

/// Wire keys used by a response schema.
///
/// The default reads `apps`, `criteria`, `name` and `description`. LLM
/// schemas often abbreviate field names to save tokens, so the parser reads
/// apps and criteria through this mapping instead of literal keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseFields {
    pub apps: String,
    pub criteria: String,
    pub criterion_name: String,
    pub criterion_description: String,
}

impl Default for ResponseFields {
    fn default() -> Self {
        Self {
            apps: "apps".to_string(),
            criteria: "criteria".to_string(),
            criterion_name: "name".to_string(),
            criterion_description: "description".to_string(),
        }
    }
}

impl ResponseFields {
    /// Single-letter keys (`a`, `c`, `n`, `d`).
    pub fn abbreviated() -> Self {
        Self {
            apps: "a".to_string(),
            criteria: "c".to_string(),
            criterion_name: "n".to_string(),
            criterion_description: "d".to_string(),
        }
    }
}

/// How a feature name is cased before it is substituted into a user prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCasing {
    /// Lower the first character when it is uppercase ("Search" -> "search").
    #[default]
    LowercaseFirst,
    /// Substitute the name exactly as stored.
    Preserve,
}

impl FeatureCasing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowercaseFirst => "lowercase_first",
            Self::Preserve => "preserve",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lowercase_first" => Some(Self::LowercaseFirst),
            "preserve" => Some(Self::Preserve),
            _ => None,
        }
    }
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument or its environment variable (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}
