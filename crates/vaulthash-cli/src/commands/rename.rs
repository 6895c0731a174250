//! Rename command handlers

use anyhow::{Context, Result};
use tracing::info;

use vaulthash_core::{BatchReport, Config, RenameEngine};

use super::open_vault;
use crate::output::{Output, OutputReporter};

/// Rename every attachment in the vault
pub fn rename_all(config: &Config, output: &Output) -> Result<BatchReport> {
    let options = config.engine_options();
    let mut storage = open_vault(config)?;
    let reporter = OutputReporter::new(output);

    let report = {
        let mut engine = RenameEngine::new(&mut storage, &reporter, &options)
            .context("Failed to scan the vault")?;
        engine.rename_all()
    };

    info!("rename-all finished: {}", report.summary());
    output.print_report(&report)?;
    Ok(report)
}

/// Rename only the attachments one document links to
pub fn rename_linked(config: &Config, document: &str, output: &Output) -> Result<BatchReport> {
    let options = config.engine_options();
    let mut storage = open_vault(config)?;
    let reporter = OutputReporter::new(output);

    let report = {
        let mut engine = RenameEngine::new(&mut storage, &reporter, &options)
            .context("Failed to scan the vault")?;
        engine.rename_linked_to(document)?
    };

    info!("rename-linked '{}' finished: {}", document, report.summary());
    output.print_report(&report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use std::fs;
    use tempfile::TempDir;
    use vaulthash_core::fingerprint;

    fn vault_config(dir: &TempDir) -> Config {
        Config {
            vault_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        }
    }

    #[test]
    fn test_rename_all_updates_vault() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("img.png"), b"pixels").unwrap();
        fs::write(dir.path().join("note.md"), "![](img.png)").unwrap();

        let output = Output::new(OutputFormat::Quiet);
        let report = rename_all(&vault_config(&dir), &output).unwrap();

        let new_name = format!("{}.png", fingerprint(b"pixels"));
        assert_eq!(report.action_count(), 1);
        assert!(dir.path().join(&new_name).exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("note.md")).unwrap(),
            format!("![]({})", new_name)
        );

        // nothing left to do on the second run
        let report = rename_all(&vault_config(&dir), &output).unwrap();
        assert_eq!(report.summary(), "No files found that need to be renamed");
    }

    #[test]
    fn test_rename_linked_unknown_document() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("note.md"), "").unwrap();

        let output = Output::new(OutputFormat::Quiet);
        let err = rename_linked(&vault_config(&dir), "missing.md", &output).unwrap_err();
        assert!(err.to_string().contains("missing.md"));
    }

    #[test]
    fn test_missing_vault_has_hint() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            vault_dir: Some(dir.path().join("nope")),
            ..Config::default()
        };

        let output = Output::new(OutputFormat::Quiet);
        let err = rename_all(&config, &output).unwrap_err();
        assert!(err.to_string().contains("--vault"));
    }
}
