use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn stable_source_label(source: &ConfigSource) -> &'static str {
    match source {
        ConfigSource::Cli => "cli",
        ConfigSource::Config => "config",
        ConfigSource::Programmatic => "programmatic",
        ConfigSource::Default => "default",
    }
}

fn source_label(source: Option<&ConfigSource>) -> String {
    stable_source_label(source.unwrap_or(&ConfigSource::Default)).to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        add(
            "database_path",
            self.database_path().display().to_string(),
        );
        add("max_concurrency", self.max_concurrency().to_string());
        add("feature_casing", self.feature_casing().as_str().to_string());
        add(
            "timeout_seconds",
            self.request_timeout().as_secs().to_string(),
        );
        add("max_retries", self.max_retries().to_string());
        add("encryption_key_env", self.encryption_key_env().to_string());
        add(
            "response_fields",
            format!(
                "apps={} criteria={} name={} description={}",
                self.response.apps,
                self.response.criteria,
                self.response.criterion_name,
                self.response.criterion_description
            ),
        );

        config
    }
}
