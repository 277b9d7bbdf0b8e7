//! SQLite persistence for apprank
//!
//! One [`Store`] wraps a single connection. Writes that belong together run
//! in one transaction; in particular [`Store::commit_experiment_results`]
//! writes every run of an execution attempt plus the experiment's final
//! status atomically.
//!
//! References that are not cascades are protected: deleting a referenced row
//! fails with [`StoreError::Protected`] naming how many dependents block it.

mod configurations;
mod configured_models;
pub mod error;
mod experiments;
mod llms;
pub mod models;
mod results;
mod schema;
mod store;
mod templates;

pub use error::StoreError;
pub use models::*;
pub use store::Store;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use apprank_utils::test_support::ranking_schema;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn next() -> usize {
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    pub fn llm(store: &Store) -> Llm {
        store
            .create_llm(&NewLlm {
                name: "gpt-4o-mini".to_string(),
                provider: "OpenAI".to_string(),
                api_key: "enc:v1:ciphertext".to_string(),
                api_endpoint: None,
            })
            .unwrap()
    }

    pub fn configuration(store: &Store) -> Configuration {
        store
            .create_configuration(&NewConfiguration {
                name: "balanced".to_string(),
                temperature: 0.7,
                top_p: None,
            })
            .unwrap()
    }

    pub fn configured_model(store: &Store) -> ConfiguredModel {
        let llm = llm(store);
        let configuration = configuration(store);
        store
            .create_configured_model(&NewConfiguredModel {
                llm_id: llm.id,
                configuration_id: configuration.id,
                short_name: format!("model-{}", next()),
            })
            .unwrap()
    }

    pub fn template(store: &Store, features: usize) -> PromptTemplate {
        store
            .create_template(&NewPromptTemplate {
                name: format!("template-{}", next()),
                system_prompt: NewSystemPrompt {
                    text: "Rank mobile apps.".to_string(),
                    schema: ranking_schema(),
                    response_fields: None,
                },
                user_prompt: NewUserPrompt {
                    text: "List the top {{ k }} apps for {{ feature }}".to_string(),
                    k: Some(5),
                    features: (1..=features)
                        .map(|i| NewFeature {
                            name: format!("Feature {i}"),
                            description: None,
                        })
                        .collect(),
                },
            })
            .unwrap()
    }

    pub fn experiment(store: &Store, models: usize, features: usize) -> (Experiment, PromptTemplate) {
        let template = template(store, features);
        let configured_model_ids = (0..models).map(|_| configured_model(store).id).collect();
        let experiment = store
            .create_experiment(&NewExperiment {
                name: format!("experiment-{}", next()),
                prompt_template_id: template.id,
                configured_model_ids,
                num_runs: 2,
            })
            .unwrap();
        (experiment, template)
    }
}
