//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/vaulthash/config.toml)
//! 3. Environment variables (VAULTHASH_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::{default_extensions, EngineOptions};

/// Environment variable prefix
const ENV_PREFIX: &str = "VAULTHASH";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "vault_dir",
    "ignore_folders",
    "allowed_extensions",
    "rename_only_linked_attachments",
    "merge_duplicates",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Vault root; the current directory when unset
    #[serde(default)]
    pub vault_dir: Option<PathBuf>,

    /// Folder prefixes whose files are never renamed
    #[serde(default)]
    pub ignore_folders: Vec<String>,

    /// Extensions eligible for renaming
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Leave attachments no document links to
    #[serde(default = "default_true")]
    pub rename_only_linked_attachments: bool,

    /// Delete duplicates whose canonical name is already taken by
    /// identical content
    #[serde(default)]
    pub merge_duplicates: bool,

    /// Log to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_dir: None,
            ignore_folders: Vec::new(),
            allowed_extensions: default_extensions(),
            rename_only_linked_attachments: true,
            merge_duplicates: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (VAULTHASH_VAULT_DIR, VAULTHASH_MERGE_DUPLICATES,
    ///    VAULTHASH_RENAME_ONLY_LINKED)
    /// 2. Config file (~/.config/vaulthash/config.toml or VAULTHASH_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `--config` when given, the default location otherwise
    pub fn load_with_cli_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // VAULTHASH_VAULT_DIR
        if let Ok(val) = std::env::var(format!("{}_VAULT_DIR", ENV_PREFIX)) {
            self.vault_dir = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // VAULTHASH_MERGE_DUPLICATES
        if let Ok(val) = std::env::var(format!("{}_MERGE_DUPLICATES", ENV_PREFIX)) {
            self.merge_duplicates = parse_flag(&val);
        }

        // VAULTHASH_RENAME_ONLY_LINKED
        if let Ok(val) = std::env::var(format!("{}_RENAME_ONLY_LINKED", ENV_PREFIX)) {
            self.rename_only_linked_attachments = parse_flag(&val);
        }
    }

    /// Set one key from its string form
    ///
    /// List keys take a comma-separated value; an empty value clears
    /// optional keys and lists.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "vault_dir" => self.vault_dir = optional_path(value),
            "log_file" => self.log_file = optional_path(value),
            "ignore_folders" => self.ignore_folders = split_list(value),
            "allowed_extensions" => {
                self.allowed_extensions = split_list(value)
                    .into_iter()
                    .map(|ext| ext.trim_start_matches('.').to_lowercase())
                    .collect()
            }
            "rename_only_linked_attachments" => {
                self.rename_only_linked_attachments = parse_bool(key, value)?
            }
            "merge_duplicates" => self.merge_duplicates = parse_bool(key, value)?,
            _ => bail!(
                "Unknown config key: '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with VAULTHASH_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vaulthash")
            .join("config.toml")
    }

    /// Vault root, falling back to the current directory
    pub fn vault_path(&self) -> PathBuf {
        self.vault_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// The policy subset handed to the rename engine
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            ignore_folders: self
                .ignore_folders
                .iter()
                .map(|f| f.trim_matches('/').to_string())
                .filter(|f| !f.is_empty())
                .collect(),
            allowed_extensions: self.allowed_extensions.clone(),
            rename_only_linked_attachments: self.rename_only_linked_attachments,
            merge_duplicates: self.merge_duplicates,
        }
    }
}

fn default_true() -> bool {
    true
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => bail!("Invalid value for {}: '{}' (expected true or false)", key, value),
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
