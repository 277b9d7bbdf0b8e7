use apprank_utils::error::ConfigError;

use super::Config;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max_concurrency) = self.execution.max_concurrency {
            if max_concurrency == 0 {
                return Err(invalid(
                    "execution.max_concurrency",
                    "must be greater than 0",
                ));
            }
            if max_concurrency > 64 {
                return Err(invalid(
                    "execution.max_concurrency",
                    "exceeds maximum limit of 64",
                ));
            }
        }

        if let Some(timeout) = self.llm.timeout_seconds {
            if timeout == 0 {
                return Err(invalid("llm.timeout_seconds", "must be at least 1 second"));
            }
            if timeout > 3600 {
                return Err(invalid(
                    "llm.timeout_seconds",
                    "exceeds maximum limit of 3600 seconds (1 hour)",
                ));
            }
        }

        if let Some(retries) = self.llm.max_retries
            && retries > 10
        {
            return Err(invalid("llm.max_retries", "exceeds maximum limit of 10"));
        }

        if let Some(env) = &self.security.encryption_key_env
            && env.trim().is_empty()
        {
            return Err(invalid("security.encryption_key_env", "must not be empty"));
        }

        let response = &self.response;
        for (key, value) in [
            ("response.apps", &response.apps),
            ("response.criteria", &response.criteria),
            ("response.criterion_name", &response.criterion_name),
            (
                "response.criterion_description",
                &response.criterion_description,
            ),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(key, "must not be empty"));
            }
        }
        if response.apps == response.criteria {
            return Err(invalid(
                "response.criteria",
                format!("must differ from response.apps ('{}')", response.apps),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = Config::builder().max_concurrency(0).build().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "execution.max_concurrency")
        );
    }

    #[test]
    fn excessive_timeout_is_rejected() {
        let err = Config::builder().timeout_seconds(7200).build().unwrap_err();
        assert!(err.to_string().contains("llm.timeout_seconds"));
    }

    #[test]
    fn clashing_response_keys_are_rejected() {
        let mut fields = apprank_utils::types::ResponseFields::default();
        fields.criteria = fields.apps.clone();
        let err = Config::builder().response_fields(fields).build().unwrap_err();
        assert!(err.to_string().contains("response.criteria"));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::builder().build().is_ok());
    }
}
