//! Init command implementation
//!
//! Handles `apprank init`: writes `.apprank/config.toml` and creates the
//! database with its schema.

use anyhow::{Context, Result};

use super::common::Session;
use crate::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, Config};

pub fn execute_init_command(force: bool, config: Config) -> Result<()> {
    let config_dir = config.base_dir.join(CONFIG_DIR_NAME);
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
    } else {
        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;
        std::fs::write(&config_path, Config::default_file_contents())
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        println!("  ✓ Wrote config: {}", config_path.display());
    }

    let session = Session::open(config)?;
    println!(
        "  ✓ Database ready: {}",
        session.config.database_path().display()
    );

    if std::env::var_os(session.config.encryption_key_env()).is_none() {
        println!(
            "\n  {} is not set. Generate a key with 'apprank keygen' before adding LLMs.",
            session.config.encryption_key_env()
        );
    }

    Ok(())
}
