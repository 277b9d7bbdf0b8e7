//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments and installs the tracing subscriber
//! - Builds CliArgs and discovers Config
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use anyhow::Result;
use clap::Parser;

use super::args::{Cli, Commands};
use super::commands::{self, Session};

use crate::error::{ConfigError, LlmError, SecretError, TemplateError, UserFriendlyError};
use crate::logging::{LogFormat, init_tracing};
use crate::{AppRankError, CliArgs, Config, ExitCode, StoreError};

/// Main CLI execution function.
///
/// Handles ALL output including errors and returns the exit code to use on
/// failure; `main` only maps it to the process exit.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    if let Err(e) = init_tracing(cli.verbose, format) {
        eprintln!("✗ Failed to initialize logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        db_path: cli.db.clone(),
        max_concurrency: cli.max_concurrency,
        timeout_seconds: cli.timeout,
        feature_casing: cli.feature_casing.clone(),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report_error(AppRankError::Config(err))),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(dispatch(cli.command, config));

    if let Err(error) = result {
        return Err(match into_app_error(error) {
            Ok(app_error) => report_error(app_error),
            Err(other) => {
                eprintln!("✗ Unexpected error: {other:#}");
                eprintln!("\n  Run with --verbose for more detailed output");
                ExitCode::INTERNAL
            }
        });
    }

    Ok(())
}

async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Init { force } => commands::execute_init_command(force, config),
        Commands::Keygen => commands::execute_keygen_command(),
        Commands::Providers => commands::execute_providers_command(),
        Commands::Config => commands::execute_config_command(&config),
        Commands::Llm(cmd) => commands::execute_llm_command(cmd, &Session::open(config)?),
        Commands::Configuration(cmd) => {
            commands::execute_configuration_command(cmd, &Session::open(config)?)
        }
        Commands::Model(cmd) => commands::execute_model_command(cmd, &Session::open(config)?),
        Commands::Template(cmd) => {
            commands::execute_template_command(cmd, &Session::open(config)?)
        }
        Commands::Experiment(cmd) => {
            commands::execute_experiment_command(cmd, &Session::open(config)?).await
        }
        Commands::Apps(cmd) => commands::execute_apps_command(cmd, &Session::open(config)?),
        Commands::Criteria(cmd) => {
            commands::execute_criteria_command(cmd, &Session::open(config)?)
        }
    }
}

/// Recover a domain error from the command's `anyhow` chain.
///
/// Every domain error has a place in [`AppRankError`], which owns the exit
/// code mapping; anything else is returned unchanged.
fn into_app_error(error: anyhow::Error) -> Result<AppRankError, anyhow::Error> {
    let error = match error.downcast::<AppRankError>() {
        Ok(e) => return Ok(e),
        Err(error) => error,
    };
    let error = match error.downcast::<StoreError>() {
        Ok(e) => return Ok(e.into()),
        Err(error) => error,
    };
    let error = match error.downcast::<SecretError>() {
        Ok(e) => return Ok(e.into()),
        Err(error) => error,
    };
    let error = match error.downcast::<TemplateError>() {
        Ok(e) => return Ok(e.into()),
        Err(error) => error,
    };
    let error = match error.downcast::<LlmError>() {
        Ok(e) => return Ok(e.into()),
        Err(error) => error,
    };
    match error.downcast::<ConfigError>() {
        Ok(e) => Ok(e.into()),
        Err(error) => Err(error),
    }
}

fn report_error(error: AppRankError) -> ExitCode {
    eprintln!("{}", error.display_for_user());
    error.to_exit_code()
}
