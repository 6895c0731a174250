//! Command handlers

pub mod config;
pub mod rename;
pub mod status;

use anyhow::{anyhow, Result};

use vaulthash_core::{Config, FsStorage};

/// Open the configured vault, attaching a hint when one applies
pub fn open_vault(config: &Config) -> Result<FsStorage> {
    FsStorage::open(config.vault_path()).map_err(|e| match e.recovery_suggestion() {
        Some(hint) => anyhow!("{}\n{}", e, hint),
        None => anyhow!(e),
    })
}
