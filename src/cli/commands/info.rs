//! Commands that do not touch the database: `keygen`, `providers`, `config`.

use anyhow::Result;

use crate::{Config, KeyCipher, ProviderRegistry};

pub fn execute_keygen_command() -> Result<()> {
    println!("{}", KeyCipher::generate_key());
    Ok(())
}

pub fn execute_providers_command() -> Result<()> {
    for name in ProviderRegistry::default().names() {
        println!("{name}");
    }
    Ok(())
}

pub fn execute_config_command(config: &Config) -> Result<()> {
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    for (key, (value, source)) in config.effective_config() {
        println!("  {key} = {value}  [{source}]");
    }
    Ok(())
}
