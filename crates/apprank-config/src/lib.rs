//! Configuration management for apprank
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. Configuration files are TOML with optional
//! `[database]`, `[execution]`, `[llm]`, `[security]` and `[response]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use apprank_utils::types::ConfigSource;
pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
