use std::path::PathBuf;

/// Overrides collected from the command line.
///
/// Environment variables that clap maps onto flags (e.g. `APPRANK_DB`) arrive
/// here too and are attributed to [`ConfigSource::Cli`](crate::ConfigSource::Cli).
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub max_concurrency: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub feature_casing: Option<String>,
}
