//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// apprank - repeatable LLM app-ranking experiments
#[derive(Parser, Debug)]
#[command(name = "apprank")]
#[command(about = "Run repeatable LLM app-ranking experiments and store the results in SQLite")]
#[command(long_about = r#"
apprank asks LLMs to rank mobile apps for a set of features, repeats every
question several times per model, and stores each run, its ranked apps and
the ranking criteria in a local SQLite database.

EXAMPLES:
  # Create the project config and database
  apprank init

  # Register a model and a sampling configuration
  export APPRANK_ENCRYPTION_KEY=$(apprank keygen)
  apprank llm create --name gpt-4o-mini --api-key "$OPENAI_API_KEY"
  apprank configuration create --name balanced --temperature 0.7
  apprank model create --llm 1 --configuration 1 --short-name mini-balanced

  # Store a prompt template from a JSON file and run an experiment
  apprank template create --file template.json
  apprank experiment create --name baseline --template 1 --model 1 --runs 5 --json

  # Inspect the results
  apprank apps list
  apprank criteria list --run 3

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .apprank/config.toml
  Use --config to specify an explicit config file path
  API keys are encrypted with the key held in $APPRANK_ENCRYPTION_KEY
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (default: .apprank/apprank.db)
    #[arg(long, global = true, env = "APPRANK_DB")]
    pub db: Option<PathBuf>,

    /// Provider calls in flight per experiment (default: 1)
    #[arg(long, global = true)]
    pub max_concurrency: Option<usize>,

    /// Per-request timeout in seconds (default: 60)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// How feature names are cased in prompts: lowercase_first or preserve
    #[arg(long, global = true)]
    pub feature_casing: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .apprank/config.toml and the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print a fresh base64 encryption key for APPRANK_ENCRYPTION_KEY
    Keygen,

    /// List the registered LLM providers
    Providers,

    /// Show the effective configuration and where each value came from
    Config,

    /// Manage LLM definitions (API keys are stored encrypted)
    #[command(subcommand)]
    Llm(LlmCommands),

    /// Manage sampling configurations
    #[command(subcommand)]
    Configuration(ConfigurationCommands),

    /// Manage configured models (an LLM paired with a configuration)
    #[command(subcommand)]
    Model(ModelCommands),

    /// Manage prompt templates
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Create, inspect and retry experiments
    #[command(subcommand)]
    Experiment(ExperimentCommands),

    /// Inspect ranked mobile apps
    #[command(subcommand)]
    Apps(AppsCommands),

    /// Inspect ranking criteria
    #[command(subcommand)]
    Criteria(CriteriaCommands),
}

/// Selects one row by id.
#[derive(Args, Debug, Clone, Copy)]
pub struct IdArg {
    /// Row id
    pub id: i64,
}

#[derive(Subcommand, Debug)]
pub enum LlmCommands {
    /// Register an LLM
    Create {
        /// Model name as the vendor knows it (e.g. gpt-4o-mini)
        #[arg(long)]
        name: String,

        /// Provider the LLM is served by
        #[arg(long, default_value = "OpenAI")]
        provider: String,

        /// Plaintext API key; stored encrypted
        #[arg(long, env = "APPRANK_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Endpoint override for OpenAI-compatible servers
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// List LLMs
    List,
    /// Show one LLM
    Show {
        id: i64,

        /// Print the decrypted API key
        #[arg(long)]
        reveal: bool,
    },
    /// Change fields of an LLM
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long, conflicts_with = "clear_endpoint")]
        endpoint: Option<String>,
        /// Go back to the provider's default endpoint
        #[arg(long)]
        clear_endpoint: bool,
    },
    /// Delete an LLM that no configured model uses
    Delete(IdArg),
}

#[derive(Subcommand, Debug)]
pub enum ConfigurationCommands {
    /// Create a sampling configuration
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        temperature: f64,
        /// Nucleus sampling; 1.0 (the default) is not sent to the provider
        #[arg(long)]
        top_p: Option<f64>,
    },
    /// List configurations
    List,
    /// Show one configuration
    Show(IdArg),
    /// Change fields of a configuration
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        top_p: Option<f64>,
    },
    /// Delete a configuration that no configured model uses
    Delete(IdArg),
}

#[derive(Subcommand, Debug)]
pub enum ModelCommands {
    /// Pair an LLM with a configuration
    Create {
        #[arg(long)]
        llm: i64,
        #[arg(long)]
        configuration: i64,
        #[arg(long)]
        short_name: String,
    },
    /// List configured models
    List,
    /// Show one configured model with its LLM and configuration
    Show(IdArg),
    /// Delete a configured model no run or experiment references
    Delete(IdArg),
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Create a template (system prompt, user prompt and features) from JSON
    ///
    /// EXAMPLE FILE:
    ///   {"name": "productivity",
    ///    "system_prompt": {"text": "You rank apps.", "schema": {...}},
    ///    "user_prompt": {"text": "List the top {{ k }} apps for {{ feature }}",
    ///                    "k": 10,
    ///                    "features": [{"name": "Offline notes"}]}}
    Create {
        /// JSON file describing the template
        #[arg(long)]
        file: PathBuf,
    },
    /// List templates
    List,
    /// Show one template with its prompts and features
    Show(IdArg),
    /// Delete a template no experiment or run references
    Delete(IdArg),
}

#[derive(Subcommand, Debug)]
pub enum ExperimentCommands {
    /// Create an experiment and execute it immediately
    Create {
        /// Unique experiment name
        #[arg(long)]
        name: String,

        /// Prompt template id
        #[arg(long)]
        template: i64,

        /// Configured model id (repeatable, order is kept)
        #[arg(long = "model")]
        models: Vec<i64>,

        /// Repetitions per (model, feature) pair
        #[arg(long, default_value_t = 1)]
        runs: u32,

        /// Print `{experiment, num_runs}` or `{error}` as JSON
        #[arg(long)]
        json: bool,
    },
    /// List experiments
    List,
    /// Show one experiment with its runs
    Show {
        /// Experiment id
        #[arg(required_unless_present = "name")]
        id: Option<i64>,

        /// Look the experiment up by name instead
        #[arg(long, conflicts_with = "id")]
        name: Option<String>,
    },
    /// Delete an experiment with its runs, rankings and criteria
    Delete(IdArg),
    /// Execute a failed experiment again
    Retry {
        id: i64,

        /// Print `{experiment, num_runs}` or `{error}` as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum AppsCommands {
    /// List every app any run has ranked
    List,
    /// Show an app with every rank it received
    Show(IdArg),
}

#[derive(Subcommand, Debug)]
pub enum CriteriaCommands {
    /// List criteria, optionally for one run
    List {
        #[arg(long)]
        run: Option<i64>,
    },
    /// Show one criterion
    Show(IdArg),
}

/// Build the clap command, for completion generation and tests.
#[must_use]
pub fn build_cli() -> clap::Command {
    use clap::CommandFactory;
    Cli::command()
}
