//! Read-only views over what experiments produced.

use anyhow::Result;
use serde_json::json;

use super::common::{Session, print_json};
use crate::cli::args::{AppsCommands, CriteriaCommands};

pub fn execute_apps_command(command: AppsCommands, session: &Session) -> Result<()> {
    let store = &session.store;
    match command {
        AppsCommands::List => {
            for app in store.list_apps()? {
                println!("{:>4}  {}", app.id, app.name);
            }
            Ok(())
        }
        AppsCommands::Show(arg) => {
            let app = store.get_app(arg.id)?;
            let rankings = store.list_rankings_for_app(app.id)?;
            print_json(&json!({ "app": app, "rankings": rankings }))
        }
    }
}

pub fn execute_criteria_command(command: CriteriaCommands, session: &Session) -> Result<()> {
    let store = &session.store;
    match command {
        CriteriaCommands::List { run } => {
            for criterion in store.list_criteria(run)? {
                let run = criterion
                    .run_id
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                println!(
                    "{:>4}  run={:<6} {}: {}",
                    criterion.id, run, criterion.name, criterion.description
                );
            }
            Ok(())
        }
        CriteriaCommands::Show(arg) => print_json(&store.get_criterion(arg.id)?),
    }
}
