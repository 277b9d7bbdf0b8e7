use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use apprank_utils::error::ConfigError;
use apprank_utils::types::{FeatureCasing, ResponseFields};

use super::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CliArgs, Config, ConfigSource, DatabaseConfig,
    ExecutionConfig, LlmConfig, SecurityConfig,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    database: Option<DatabaseConfig>,
    execution: Option<ExecutionConfig>,
    llm: Option<LlmConfig>,
    security: Option<SecurityConfig>,
    response: Option<ResponseFields>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for discovery when no explicit path
    /// is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("cannot determine current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();

        let mut database = DatabaseConfig::default();
        let mut execution = ExecutionConfig::default();
        let mut llm = LlmConfig::default();
        let mut security = SecurityConfig::default();
        let mut response = ResponseFields::default();

        for key in [
            "database_path",
            "max_concurrency",
            "feature_casing",
            "timeout_seconds",
            "max_retries",
            "encryption_key_env",
            "response_fields",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir).or_else(Self::user_config_file),
        };

        // Relative paths in a project file resolve against the directory that
        // holds `.apprank/`; anything else resolves against the start dir.
        let base_dir = config_path
            .as_deref()
            .and_then(project_root_for)
            .unwrap_or_else(|| start_dir.to_path_buf());

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)?;
            let config_source = ConfigSource::Config;

            if let Some(file_database) = file_config.database
                && file_database.path.is_some()
            {
                database.path = file_database.path;
                source_attribution.insert("database_path".to_string(), config_source.clone());
            }

            if let Some(file_execution) = file_config.execution {
                if file_execution.max_concurrency.is_some() {
                    execution.max_concurrency = file_execution.max_concurrency;
                    source_attribution.insert("max_concurrency".to_string(), config_source.clone());
                }
                if file_execution.feature_casing.is_some() {
                    execution.feature_casing = file_execution.feature_casing;
                    source_attribution.insert("feature_casing".to_string(), config_source.clone());
                }
            }

            if let Some(file_llm) = file_config.llm {
                if file_llm.timeout_seconds.is_some() {
                    llm.timeout_seconds = file_llm.timeout_seconds;
                    source_attribution.insert("timeout_seconds".to_string(), config_source.clone());
                }
                if file_llm.max_retries.is_some() {
                    llm.max_retries = file_llm.max_retries;
                    source_attribution.insert("max_retries".to_string(), config_source.clone());
                }
            }

            if let Some(file_security) = file_config.security
                && file_security.encryption_key_env.is_some()
            {
                security.encryption_key_env = file_security.encryption_key_env;
                source_attribution.insert("encryption_key_env".to_string(), config_source.clone());
            }

            if let Some(file_response) = file_config.response {
                response = file_response;
                source_attribution.insert("response_fields".to_string(), config_source);
            }
        }

        // CLI overrides (CLI > file > defaults)
        if let Some(db_path) = &cli_args.db_path {
            database.path = Some(db_path.clone());
            source_attribution.insert("database_path".to_string(), ConfigSource::Cli);
        }
        if let Some(max_concurrency) = cli_args.max_concurrency {
            execution.max_concurrency = Some(max_concurrency);
            source_attribution.insert("max_concurrency".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli_args.timeout_seconds {
            llm.timeout_seconds = Some(timeout);
            source_attribution.insert("timeout_seconds".to_string(), ConfigSource::Cli);
        }
        if let Some(casing) = &cli_args.feature_casing {
            let parsed =
                FeatureCasing::parse(casing).ok_or_else(|| ConfigError::InvalidValue {
                    key: "execution.feature_casing".to_string(),
                    value: casing.clone(),
                })?;
            execution.feature_casing = Some(parsed);
            source_attribution.insert("feature_casing".to_string(), ConfigSource::Cli);
        }

        // CLI paths are relative to where the command was run, not the project root.
        if let Some(db_path) = &cli_args.db_path
            && db_path.is_relative()
        {
            database.path = Some(start_dir.join(db_path));
        }

        let config = Self {
            database,
            execution,
            llm,
            security,
            response,
            base_dir,
            config_file: config_path,
            source_attribution,
        };

        config.validate()?;
        tracing::debug!(
            config_file = ?config.config_file,
            database = %config.database_path().display(),
            "Configuration resolved"
        );

        Ok(config)
    }

    /// Discover config file by searching upward from a given directory.
    ///
    /// Walks up the directory tree looking for `.apprank/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir;

        loop {
            let config_path = current_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            current_dir = current_dir.parent()?;
        }
    }

    /// Per-user configuration file (`<config dir>/apprank/config.toml`), if present.
    fn user_config_file() -> Option<PathBuf> {
        let path = dirs::config_dir()?.join("apprank").join(CONFIG_FILE_NAME);
        path.exists().then_some(path)
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidFile(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }
}

/// `/project/.apprank/config.toml` -> `/project`; other layouts resolve to the
/// file's own directory.
fn project_root_for(config_file: &Path) -> Option<PathBuf> {
    let dir = config_file.parent()?;
    if dir.file_name().is_some_and(|name| name == CONFIG_DIR_NAME) {
        dir.parent().map(Path::to_path_buf)
    } else {
        Some(dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project_with_config(contents: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::create_dir(dir.path().join(CONFIG_DIR_NAME)).unwrap();
        fs::write(
            dir.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            contents,
        )
        .unwrap();
        dir
    }

    #[test]
    fn discovers_config_upward_from_nested_directory() {
        let project = project_with_config("[execution]\nmax_concurrency = 3\n");
        let nested = project.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_from(&nested, &CliArgs::default()).unwrap();
        assert_eq!(config.max_concurrency(), 3);
        assert_eq!(
            config.source_attribution.get("max_concurrency"),
            Some(&ConfigSource::Config)
        );
        assert_eq!(config.base_dir, project.path());
    }

    #[test]
    fn cli_overrides_file_which_overrides_defaults() {
        let project = project_with_config(
            "[execution]\nmax_concurrency = 3\n\n[llm]\ntimeout_seconds = 30\n",
        );
        let cli = CliArgs {
            max_concurrency: Some(8),
            ..CliArgs::default()
        };

        let config = Config::discover_from(project.path(), &cli).unwrap();
        assert_eq!(config.max_concurrency(), 8);
        assert_eq!(
            config.source_attribution.get("max_concurrency"),
            Some(&ConfigSource::Cli)
        );
        assert_eq!(config.request_timeout().as_secs(), 30);
        assert_eq!(config.max_retries(), 2);
        assert_eq!(
            config.source_attribution.get("max_retries"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn explicit_missing_config_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(dir.path().join("nope.toml")),
            ..CliArgs::default()
        };
        let err = Config::discover_from(dir.path(), &cli).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let project = project_with_config("[selectors]\ninclude = []\n");
        let err = Config::discover_from(project.path(), &CliArgs::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }

    #[test]
    fn response_section_replaces_default_keys() {
        let project = project_with_config(
            "[response]\napps = \"a\"\ncriteria = \"c\"\ncriterion_name = \"n\"\ncriterion_description = \"d\"\n",
        );
        let config = Config::discover_from(project.path(), &CliArgs::default()).unwrap();
        assert_eq!(config.response, ResponseFields::abbreviated());
    }

    #[test]
    fn invalid_feature_casing_flag_is_rejected() {
        let project = project_with_config("");
        let cli = CliArgs {
            feature_casing: Some("shout".to_string()),
            ..CliArgs::default()
        };
        let err = Config::discover_from(project.path(), &cli).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn relative_cli_db_path_resolves_against_start_dir() {
        let project = project_with_config("[database]\npath = \"from-file.db\"\n");
        let nested = project.path().join("sub");
        fs::create_dir(&nested).unwrap();
        let cli = CliArgs {
            db_path: Some(PathBuf::from("cli.db")),
            ..CliArgs::default()
        };
        let config = Config::discover_from(&nested, &cli).unwrap();
        assert_eq!(config.database_path(), nested.join("cli.db"));
    }
}
