//! Experiment commands
//!
//! `create` and `retry` execute synchronously: the command returns once every
//! run has been stored or the experiment has been marked failed.

use anyhow::Result;
use serde_json::json;

use super::common::{Session, print_json};
use crate::cli::args::ExperimentCommands;
use crate::{AppRankError, ExperimentReport, NewExperiment};

pub async fn execute_experiment_command(
    command: ExperimentCommands,
    session: &Session,
) -> Result<()> {
    match command {
        ExperimentCommands::Create {
            name,
            template,
            models,
            runs,
            json,
        } => {
            let request = NewExperiment {
                name,
                prompt_template_id: template,
                configured_model_ids: models,
                num_runs: runs,
            };
            let result = match session.service() {
                Ok(service) => service.create_and_execute(&request).await,
                Err(err) => Err(err),
            };
            report(result, json)
        }
        ExperimentCommands::Retry { id, json } => {
            let result = match session.service() {
                Ok(service) => service.retry(id).await,
                Err(err) => Err(err),
            };
            report(result, json)
        }
        ExperimentCommands::List => {
            for experiment in session.store.list_experiments()? {
                println!(
                    "{:>4}  {:<24} {:<10} template={} models={} runs={}",
                    experiment.id,
                    experiment.name,
                    experiment.status,
                    experiment.prompt_template_id,
                    experiment.configured_model_ids.len(),
                    experiment.num_runs
                );
            }
            Ok(())
        }
        ExperimentCommands::Show { id, name } => {
            let store = &session.store;
            let experiment = match (id, name) {
                (_, Some(name)) => store.get_experiment_by_name(&name)?,
                (Some(id), None) => store.get_experiment(id)?,
                (None, None) => {
                    return Err(AppRankError::validation("Pass an experiment id or --name").into());
                }
            };
            let mut runs = Vec::new();
            for run in store.list_runs_for_experiment(experiment.id)? {
                let rankings = store.list_rankings_for_run(run.id)?;
                let criteria = store.list_criteria(Some(run.id))?;
                runs.push(json!({
                    "run": run,
                    "rankings": rankings,
                    "criteria": criteria,
                }));
            }
            print_json(&json!({ "experiment": experiment, "runs": runs }))
        }
        ExperimentCommands::Delete(arg) => {
            session.store.delete_experiment(arg.id)?;
            println!("Deleted experiment {}", arg.id);
            Ok(())
        }
    }
}

/// Print the outcome of an execution. Errors are echoed as `{error}` in JSON
/// mode and still returned so the exit code reflects them.
fn report(result: Result<ExperimentReport, AppRankError>, json: bool) -> Result<()> {
    match result {
        Ok(report) if json => print_json(&json!({
            "experiment": report.experiment,
            "num_runs": report.num_runs,
        })),
        Ok(report) => {
            let elapsed: f64 = report.runs.iter().map(|r| r.elapsed_time).sum();
            println!(
                "Experiment {} '{}' {}: {} run(s), {:.2}s waiting on providers",
                report.experiment.id,
                report.experiment.name,
                report.experiment.status,
                report.runs.len(),
                elapsed
            );
            Ok(())
        }
        Err(err) => {
            if json {
                print_json(&json!({ "error": err.to_string() }))?;
            }
            Err(err.into())
        }
    }
}
