//! Argument parsing tests.

use super::args::{Cli, Commands, CriteriaCommands, ExperimentCommands, LlmCommands};
use super::build_cli;
use clap::Parser;

#[test]
fn cli_definition_is_consistent() {
    build_cli().debug_assert();
}

#[test]
fn experiment_create_collects_models_in_order() {
    let cli = Cli::try_parse_from([
        "apprank",
        "experiment",
        "create",
        "--name",
        "baseline",
        "--template",
        "2",
        "--model",
        "5",
        "--model",
        "3",
        "--runs",
        "4",
        "--json",
    ])
    .unwrap();

    match cli.command {
        Commands::Experiment(ExperimentCommands::Create {
            name,
            template,
            models,
            runs,
            json,
        }) => {
            assert_eq!(name, "baseline");
            assert_eq!(template, 2);
            assert_eq!(models, vec![5, 3]);
            assert_eq!(runs, 4);
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn runs_default_to_one() {
    let cli = Cli::try_parse_from([
        "apprank", "experiment", "create", "--name", "x", "--template", "1",
    ])
    .unwrap();
    match cli.command {
        Commands::Experiment(ExperimentCommands::Create { runs, models, .. }) => {
            assert_eq!(runs, 1);
            assert!(models.is_empty());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn global_flags_work_after_the_subcommand() {
    let cli = Cli::try_parse_from([
        "apprank",
        "apps",
        "list",
        "--db",
        "/tmp/ranks.db",
        "--max-concurrency",
        "3",
        "-v",
    ])
    .unwrap();
    assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/ranks.db")));
    assert_eq!(cli.max_concurrency, Some(3));
    assert!(cli.verbose);
}

#[test]
fn llm_provider_defaults_to_openai() {
    let cli = Cli::try_parse_from([
        "apprank", "llm", "create", "--name", "gpt-4o", "--api-key", "sk-test",
    ])
    .unwrap();
    match cli.command {
        Commands::Llm(LlmCommands::Create {
            provider, endpoint, ..
        }) => {
            assert_eq!(provider, "OpenAI");
            assert!(endpoint.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn endpoint_and_clear_endpoint_conflict() {
    let result = Cli::try_parse_from([
        "apprank",
        "llm",
        "update",
        "1",
        "--endpoint",
        "http://localhost:8080",
        "--clear-endpoint",
    ]);
    assert!(result.is_err());
}

#[test]
fn criteria_list_takes_optional_run() {
    let cli = Cli::try_parse_from(["apprank", "criteria", "list", "--run", "7"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Criteria(CriteriaCommands::List { run: Some(7) })
    ));
}

#[test]
fn experiment_show_takes_an_id_or_a_name() {
    let cli = Cli::try_parse_from(["apprank", "experiment", "show", "--name", "baseline"]).unwrap();
    match cli.command {
        Commands::Experiment(ExperimentCommands::Show { id, name }) => {
            assert_eq!(id, None);
            assert_eq!(name.as_deref(), Some("baseline"));
        }
        other => panic!("unexpected command: {other:?}"),
    }

    assert!(Cli::try_parse_from(["apprank", "experiment", "show"]).is_err());
    assert!(
        Cli::try_parse_from(["apprank", "experiment", "show", "3", "--name", "baseline"]).is_err()
    );
}
