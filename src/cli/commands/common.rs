//! Common helpers used across CLI commands: opening the store, building the
//! experiment service, and printing JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::{
    AppRankError, Config, ExecutionSettings, ExperimentExecutor, ExperimentService, KeyCipher,
    ProviderRegistry, Store,
};

/// Everything a command needs: the effective config and an open store.
pub struct Session {
    pub config: Config,
    pub store: Store,
}

impl Session {
    /// Open (creating if needed) the configured database.
    pub fn open(config: Config) -> Result<Self> {
        let path = config.database_path();
        debug!(path = %path.display(), "Opening database");
        let store = Store::open(&path)?;
        Ok(Self { config, store })
    }

    /// Cipher keyed from the configured environment variable.
    ///
    /// Only commands that touch API keys ask for it, so listing rows works
    /// without the key.
    pub fn cipher(&self) -> Result<KeyCipher, AppRankError> {
        Ok(KeyCipher::from_env(self.config.encryption_key_env())?)
    }

    pub fn service(&self) -> Result<ExperimentService, AppRankError> {
        let executor = ExperimentExecutor::new(
            self.store.clone(),
            ProviderRegistry::default(),
            self.cipher()?,
            ExecutionSettings::from(&self.config),
        );
        Ok(ExperimentService::new(executor))
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
