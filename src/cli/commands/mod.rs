//! CLI command implementations.
//!
//! Handlers take parsed arguments and an open [`Session`] and return
//! `anyhow::Result`; `run.rs` turns errors into reports and exit codes.

mod catalog;
mod common;
mod experiment;
mod info;
mod init;
mod results;
mod template;

pub use catalog::{execute_configuration_command, execute_llm_command, execute_model_command};
pub use common::Session;
pub use experiment::execute_experiment_command;
pub use info::{execute_config_command, execute_keygen_command, execute_providers_command};
pub use init::execute_init_command;
pub use results::{execute_apps_command, execute_criteria_command};
pub use template::execute_template_command;
