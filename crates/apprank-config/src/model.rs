use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use apprank_utils::types::{ConfigSource, FeatureCasing, ResponseFields};

/// Directory holding the project configuration and the default database.
pub const CONFIG_DIR_NAME: &str = ".apprank";

/// Configuration file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default database file name inside [`CONFIG_DIR_NAME`].
pub const DEFAULT_DATABASE_FILE: &str = "apprank.db";

/// Environment variable holding the base64 encryption key unless overridden.
pub const DEFAULT_ENCRYPTION_KEY_ENV: &str = "APPRANK_ENCRYPTION_KEY";

pub const DEFAULT_MAX_CONCURRENCY: usize = 1;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for apprank.
///
/// `Config` is assembled with precedence CLI arguments > config file >
/// built-in defaults. Use [`Config::discover()`] for CLI behavior or
/// [`Config::builder()`] for deterministic programmatic configuration.
///
/// # Configuration File Format
///
/// ```toml
/// [database]
/// path = "apprank.db"
///
/// [execution]
/// max_concurrency = 4
/// feature_casing = "lowercase_first"
///
/// [llm]
/// timeout_seconds = 60
/// max_retries = 2
///
/// [security]
/// encryption_key_env = "APPRANK_ENCRYPTION_KEY"
///
/// [response]
/// apps = "apps"
/// criteria = "criteria"
/// criterion_name = "name"
/// criterion_description = "description"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub execution: ExecutionConfig,
    pub llm: LlmConfig,
    pub security: SecurityConfig,
    /// Fallback wire keys for system prompts that do not carry their own.
    pub response: ResponseFields,
    /// Project directory the relative paths are resolved against.
    pub base_dir: PathBuf,
    /// Configuration file that was loaded, if any.
    pub config_file: Option<PathBuf>,
    /// Source attribution for each setting.
    pub source_attribution: HashMap<String, ConfigSource>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Provider calls in flight per experiment. 1 executes sequentially.
    pub max_concurrency: Option<usize>,
    pub feature_casing: Option<FeatureCasing>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Per-request timeout handed to the provider.
    pub timeout_seconds: Option<u64>,
    /// Transport retries for 5xx and network failures.
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Name of the environment variable holding the encryption key.
    pub encryption_key_env: Option<String>,
}

impl Config {
    /// Resolved database path. Relative paths are anchored at `base_dir`.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        match &self.database.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.base_dir.join(path),
            None => self
                .base_dir
                .join(CONFIG_DIR_NAME)
                .join(DEFAULT_DATABASE_FILE),
        }
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.execution
            .max_concurrency
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
    }

    #[must_use]
    pub fn feature_casing(&self) -> FeatureCasing {
        self.execution.feature_casing.unwrap_or_default()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.llm.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn encryption_key_env(&self) -> &str {
        self.security
            .encryption_key_env
            .as_deref()
            .unwrap_or(DEFAULT_ENCRYPTION_KEY_ENV)
    }

    /// Contents written by `apprank init` for a fresh project.
    #[must_use]
    pub fn default_file_contents() -> String {
        format!(
            "# apprank configuration\n\
             \n\
             [execution]\n\
             max_concurrency = {DEFAULT_MAX_CONCURRENCY}\n\
             feature_casing = \"lowercase_first\"\n\
             \n\
             [llm]\n\
             timeout_seconds = {DEFAULT_TIMEOUT_SECONDS}\n\
             max_retries = {DEFAULT_MAX_RETRIES}\n\
             \n\
             [security]\n\
             encryption_key_env = \"{DEFAULT_ENCRYPTION_KEY_ENV}\"\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_contents_parse_back() {
        let config = Config::builder()
            .base_dir("/tmp/project")
            .build()
            .unwrap();
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/project/.apprank/apprank.db")
        );

        let parsed: toml::Value = toml::from_str(&Config::default_file_contents()).unwrap();
        assert_eq!(
            parsed["execution"]["feature_casing"].as_str(),
            Some("lowercase_first")
        );
    }

    #[test]
    fn relative_database_path_is_anchored() {
        let config = Config::builder()
            .base_dir("/srv/apprank")
            .database_path("data/results.db")
            .build()
            .unwrap();
        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/apprank/data/results.db")
        );
    }
}
