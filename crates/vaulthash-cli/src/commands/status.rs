//! Status command handler

use anyhow::{Context, Result};

use vaulthash_core::{Config, RenameEngine, TracingReporter};

use super::open_vault;
use crate::output::{Output, OutputFormat};

/// Vault summary shown by `vaulthash status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStatus {
    pub documents: usize,
    pub attachments: usize,
    pub pending: Vec<String>,
}

/// Scan the vault without changing anything
pub fn collect(config: &Config) -> Result<VaultStatus> {
    let options = config.engine_options();
    let mut storage = open_vault(config)?;
    let engine = RenameEngine::new(&mut storage, &TracingReporter, &options)
        .context("Failed to scan the vault")?;

    let index = engine.index();
    Ok(VaultStatus {
        documents: index.document_count(),
        attachments: index.attachments().count(),
        pending: engine.pending_attachments(),
    })
}

/// Show status information
pub fn show(config: &Config, output: &Output) -> Result<()> {
    let status = collect(config)?;
    let vault = config.vault_path();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "vault": vault,
                    "counts": {
                        "documents": status.documents,
                        "attachments": status.attachments,
                        "pending": status.pending.len()
                    },
                    "pending": status.pending,
                    "merge_duplicates": config.merge_duplicates,
                    "rename_only_linked_attachments": config.rename_only_linked_attachments
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", status.pending.len());
        }
        OutputFormat::Human => {
            println!("vaulthash Status");
            println!("================");
            println!();
            println!("Vault: {}", vault.display());
            println!();
            println!("Contents:");
            println!("  Documents:   {}", status.documents);
            println!("  Attachments: {}", status.attachments);
            println!();
            println!("Policy:");
            println!(
                "  Merge duplicates:   {}",
                if config.merge_duplicates { "enabled" } else { "disabled" }
            );
            println!(
                "  Only linked files:  {}",
                if config.rename_only_linked_attachments {
                    "yes"
                } else {
                    "no"
                }
            );
            println!();
            if status.pending.is_empty() {
                println!("All attachments are named after their content.");
            } else {
                println!("Not yet renamed ({}):", status.pending.len());
                for path in &status.pending {
                    println!("  {}", path);
                }
            }
        }
    }

    Ok(())
}
