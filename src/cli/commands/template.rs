//! Template commands: create from a JSON file, list, show, delete.

use anyhow::{Context, Result};

use super::common::{Session, print_json};
use crate::NewPromptTemplate;
use crate::cli::args::TemplateCommands;

pub fn execute_template_command(command: TemplateCommands, session: &Session) -> Result<()> {
    let store = &session.store;
    match command {
        TemplateCommands::Create { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read template file: {}", file.display()))?;
            let new: NewPromptTemplate = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid template JSON in {}", file.display()))?;
            apprank_prompt_template::validate(&new.user_prompt.text)?;
            print_json(&store.create_template(&new)?)
        }
        TemplateCommands::List => {
            for template in store.list_templates()? {
                println!(
                    "{:>4}  {:<24} {} feature(s)",
                    template.id,
                    template.name,
                    template.user_prompt.features.len()
                );
            }
            Ok(())
        }
        TemplateCommands::Show(arg) => print_json(&store.get_template(arg.id)?),
        TemplateCommands::Delete(arg) => {
            store.delete_template(arg.id)?;
            println!("Deleted template {}", arg.id);
            Ok(())
        }
    }
}
