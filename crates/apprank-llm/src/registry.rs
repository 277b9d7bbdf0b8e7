use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::LlmError;
use crate::openai_backend::{OpenAiProvider, PROVIDER_NAME as OPENAI};
use crate::types::{LlmProvider, ProviderSettings};

/// Builds a provider instance from its settings.
pub type ProviderConstructor =
    Arc<dyn Fn(ProviderSettings) -> Result<Box<dyn LlmProvider>, LlmError> + Send + Sync>;

/// Name -> constructor mapping used to select a provider.
///
/// Registries are plain values: the CLI builds one with the shipped
/// providers, tests build one with scripted fakes.
#[derive(Clone)]
pub struct ProviderRegistry {
    constructors: BTreeMap<String, ProviderConstructor>,
}

impl Default for ProviderRegistry {
    /// A registry with the OpenAI provider registered.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(OPENAI, |settings| {
            Ok(Box::new(OpenAiProvider::new(settings)?) as Box<dyn LlmProvider>)
        });
        registry
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// A registry with nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(ProviderSettings) -> Result<Box<dyn LlmProvider>, LlmError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered provider names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Construct the provider registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::NotImplemented` listing the registered names when
    /// `name` is unknown, or whatever the constructor returns.
    pub fn create(
        &self,
        name: &str,
        settings: ProviderSettings,
    ) -> Result<Box<dyn LlmProvider>, LlmError> {
        let constructor =
            self.constructors
                .get(name)
                .ok_or_else(|| LlmError::NotImplemented {
                    provider: name.to_string(),
                    available: self.names(),
                })?;
        constructor(settings)
    }
}
