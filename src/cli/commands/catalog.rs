//! CRUD commands for LLMs, sampling configurations and configured models.

use anyhow::Result;
use serde_json::json;
use tracing::warn;

use super::common::{Session, print_json};
use crate::cli::args::{ConfigurationCommands, LlmCommands, ModelCommands};
use crate::secrets::mask;
use crate::{
    ConfigurationUpdate, Llm, LlmUpdate, NewConfiguration, NewConfiguredModel, NewLlm,
    ProviderRegistry,
};

/// LLM as shown to the user: the key is masked unless revealed.
fn llm_view(llm: &Llm, api_key: String) -> serde_json::Value {
    json!({
        "id": llm.id,
        "name": llm.name,
        "provider": llm.provider,
        "api_key": api_key,
        "api_endpoint": llm.api_endpoint,
        "created_at": llm.created_at,
    })
}

fn warn_unknown_provider(provider: &str) {
    let registry = ProviderRegistry::default();
    if !registry.contains(provider) {
        warn!(
            provider,
            available = ?registry.names(),
            "Provider is not registered; experiments using this LLM will fail"
        );
    }
}

pub fn execute_llm_command(command: LlmCommands, session: &Session) -> Result<()> {
    match command {
        LlmCommands::Create {
            name,
            provider,
            api_key,
            endpoint,
        } => {
            warn_unknown_provider(&provider);
            let service = session.service()?;
            let llm = service.create_llm(&NewLlm {
                name,
                provider,
                api_key: api_key.clone(),
                api_endpoint: endpoint,
            })?;
            print_json(&llm_view(&llm, mask(&api_key)))
        }
        LlmCommands::List => {
            for llm in session.store.list_llms()? {
                println!(
                    "{:>4}  {:<24} {:<10} {}",
                    llm.id,
                    llm.name,
                    llm.provider,
                    llm.api_endpoint.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        LlmCommands::Show { id, reveal } => {
            let llm = session.store.get_llm(id)?;
            let api_key = if reveal {
                session.service()?.reveal_api_key(id)?
            } else {
                mask(&llm.api_key)
            };
            print_json(&llm_view(&llm, api_key))
        }
        LlmCommands::Update {
            id,
            name,
            provider,
            api_key,
            endpoint,
            clear_endpoint,
        } => {
            if let Some(provider) = &provider {
                warn_unknown_provider(provider);
            }
            let api_endpoint = if clear_endpoint {
                Some(None)
            } else {
                endpoint.map(Some)
            };
            let update = LlmUpdate {
                name,
                provider,
                api_key,
                api_endpoint,
            };
            // Only a new key needs the cipher.
            let llm = if update.api_key.is_some() {
                session.service()?.update_llm(id, &update)?
            } else {
                session.store.update_llm(id, &update)?
            };
            print_json(&llm_view(&llm, mask(&llm.api_key)))
        }
        LlmCommands::Delete(arg) => {
            session.store.delete_llm(arg.id)?;
            println!("Deleted LLM {}", arg.id);
            Ok(())
        }
    }
}

pub fn execute_configuration_command(
    command: ConfigurationCommands,
    session: &Session,
) -> Result<()> {
    let store = &session.store;
    match command {
        ConfigurationCommands::Create {
            name,
            temperature,
            top_p,
        } => print_json(&store.create_configuration(&NewConfiguration {
            name,
            temperature,
            top_p,
        })?),
        ConfigurationCommands::List => {
            for configuration in store.list_configurations()? {
                println!(
                    "{:>4}  {:<24} temperature={} top_p={}",
                    configuration.id,
                    configuration.name,
                    configuration.temperature,
                    configuration.top_p
                );
            }
            Ok(())
        }
        ConfigurationCommands::Show(arg) => print_json(&store.get_configuration(arg.id)?),
        ConfigurationCommands::Update {
            id,
            name,
            temperature,
            top_p,
        } => print_json(&store.update_configuration(
            id,
            &ConfigurationUpdate {
                name,
                temperature,
                top_p,
            },
        )?),
        ConfigurationCommands::Delete(arg) => {
            store.delete_configuration(arg.id)?;
            println!("Deleted configuration {}", arg.id);
            Ok(())
        }
    }
}

pub fn execute_model_command(command: ModelCommands, session: &Session) -> Result<()> {
    let store = &session.store;
    match command {
        ModelCommands::Create {
            llm,
            configuration,
            short_name,
        } => print_json(&store.create_configured_model(&NewConfiguredModel {
            llm_id: llm,
            configuration_id: configuration,
            short_name,
        })?),
        ModelCommands::List => {
            for model in store.list_configured_models()? {
                println!(
                    "{:>4}  {:<24} llm={} configuration={}",
                    model.id, model.short_name, model.llm_id, model.configuration_id
                );
            }
            Ok(())
        }
        ModelCommands::Show(arg) => {
            let detail = store.get_configured_model_detail(arg.id)?;
            print_json(&json!({
                "id": detail.model.id,
                "short_name": detail.model.short_name,
                "llm": llm_view(&detail.llm, mask(&detail.llm.api_key)),
                "configuration": detail.configuration,
            }))
        }
        ModelCommands::Delete(arg) => {
            store.delete_configured_model(arg.id)?;
            println!("Deleted configured model {}", arg.id);
            Ok(())
        }
    }
}
