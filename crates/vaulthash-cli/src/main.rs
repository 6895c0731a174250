//! vaulthash CLI
//!
//! Command-line interface for vaulthash - content-addressed attachment names
//! for note vaults.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vaulthash_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "vaulthash")]
#[command(about = "vaulthash - rename vault attachments after their content, keeping links intact")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Vault directory (overrides vault_dir from the config file)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename every attachment in the vault
    RenameAll,
    /// Rename the attachments linked from one document
    RenameLinked {
        /// Vault-relative path of the document (e.g. notes/trip.md)
        document: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show vault status (counts, attachments not yet renamed)
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (vault_dir, ignore_folders, allowed_extensions,
        /// rename_only_linked_attachments, merge_duplicates, log_file)
        key: String,
        /// Configuration value (comma-separated for lists)
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { command } => handle_config_command(command, config_path, &output),
        Commands::RenameAll => {
            let config = load_config(config_path, cli.vault)?;
            commands::rename::rename_all(&config, &output).map(|_| ())
        }
        Commands::RenameLinked { document } => {
            let config = load_config(config_path, cli.vault)?;
            commands::rename::rename_linked(&config, &document, &output).map(|_| ())
        }
        Commands::Status => {
            let config = load_config(config_path, cli.vault)?;
            commands::status::show(&config, &output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&Path>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(&key, &value, config_path, output)
        }
    }
}

/// Load configuration, apply `--vault`, and start logging
fn load_config(config_path: Option<&Path>, vault: Option<PathBuf>) -> Result<Config> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    if let Some(vault) = vault {
        config.vault_dir = Some(vault);
    }
    init_logging(&config);
    Ok(config)
}

/// Initialize logging
///
/// Only initializes if VAULTHASH_LOG environment variable is set.
/// Logs to config.log_file when set, stderr otherwise.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("VAULTHASH_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "vaulthash_core={},vaulthash_cli={}",
        log_level, log_level
    ));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
