use std::collections::HashMap;
use std::path::PathBuf;

use apprank_utils::error::ConfigError;
use apprank_utils::types::{FeatureCasing, ResponseFields};

use super::{Config, ConfigSource, DatabaseConfig, ExecutionConfig, LlmConfig, SecurityConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding apprank or in tests, where the result must not
    /// depend on the working directory or the user's config files.
    ///
    /// ```rust
    /// use apprank_config::Config;
    ///
    /// let config = Config::builder()
    ///     .database_path("/tmp/apprank.db")
    ///     .max_concurrency(4)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.max_concurrency(), 4);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration of apprank.
///
/// All values set via the builder are attributed to
/// [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    base_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    max_concurrency: Option<usize>,
    feature_casing: Option<FeatureCasing>,
    timeout_seconds: Option<u64>,
    max_retries: Option<u32>,
    encryption_key_env: Option<String>,
    response_fields: Option<ResponseFields>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory relative database paths resolve against. Defaults to `.`.
    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    #[must_use]
    pub fn feature_casing(mut self, casing: FeatureCasing) -> Self {
        self.feature_casing = Some(casing);
        self
    }

    #[must_use]
    pub fn timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = Some(secs);
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn encryption_key_env(mut self, name: impl Into<String>) -> Self {
        self.encryption_key_env = Some(name.into());
        self
    }

    #[must_use]
    pub fn response_fields(mut self, fields: ResponseFields) -> Self {
        self.response_fields = Some(fields);
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut attribute = |key: &str, set: bool| {
            let source = if set {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        attribute("database_path", self.database_path.is_some());
        attribute("max_concurrency", self.max_concurrency.is_some());
        attribute("feature_casing", self.feature_casing.is_some());
        attribute("timeout_seconds", self.timeout_seconds.is_some());
        attribute("max_retries", self.max_retries.is_some());
        attribute("encryption_key_env", self.encryption_key_env.is_some());
        attribute("response_fields", self.response_fields.is_some());

        let config = Config {
            database: DatabaseConfig {
                path: self.database_path,
            },
            execution: ExecutionConfig {
                max_concurrency: self.max_concurrency,
                feature_casing: self.feature_casing,
            },
            llm: LlmConfig {
                timeout_seconds: self.timeout_seconds,
                max_retries: self.max_retries,
            },
            security: SecurityConfig {
                encryption_key_env: self.encryption_key_env,
            },
            response: self.response_fields.unwrap_or_default(),
            base_dir: self.base_dir.unwrap_or_else(|| PathBuf::from(".")),
            config_file: None,
            source_attribution,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_values_are_programmatic() {
        let config = Config::builder()
            .feature_casing(FeatureCasing::Preserve)
            .max_retries(0)
            .build()
            .unwrap();

        assert_eq!(config.feature_casing(), FeatureCasing::Preserve);
        assert_eq!(config.max_retries(), 0);
        assert_eq!(
            config.source_attribution.get("feature_casing"),
            Some(&ConfigSource::Programmatic)
        );
        assert_eq!(
            config.source_attribution.get("timeout_seconds"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn unset_values_fall_back_to_defaults() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.max_concurrency(), 1);
        assert_eq!(config.feature_casing(), FeatureCasing::LowercaseFirst);
        assert_eq!(config.request_timeout().as_secs(), 60);
        assert_eq!(config.encryption_key_env(), "APPRANK_ENCRYPTION_KEY");
        assert_eq!(config.response, ResponseFields::default());
    }
}
