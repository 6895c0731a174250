//! Filesystem-backed vault storage
//!
//! Maps vault paths onto a root directory. Hidden entries (names starting
//! with `.`, e.g. `.obsidian`, `.trash`) are not listed. Text writes are
//! atomic: content goes to a temp file next to the target, is synced, then
//! renamed over it.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::{Storage, StorageError, StorageResult};

/// Vault storage rooted at a directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Open a vault directory
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StorageError::VaultNotFound { path: root });
        }
        Ok(Self { root })
    }

    /// The vault root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault path to a filesystem path
    ///
    /// Rejects empty paths and any `..` segment so nothing outside the vault
    /// can be touched.
    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                details: "empty path".to_string(),
            });
        }
        if trimmed.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                details: "path escapes the vault".to_string(),
            });
        }
        Ok(self.root.join(trimmed))
    }

    fn vault_path(&self, entry: &DirEntry) -> Option<String> {
        let relative = entry.path().strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

impl Storage for FsStorage {
    fn list_all_files(&self) -> StorageResult<Vec<String>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        for entry in walker {
            let entry = entry.map_err(|e| StorageError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            match self.vault_path(&entry) {
                Some(path) => files.push(path),
                None => debug!("Skipping non UTF-8 path {:?}", entry.path()),
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_bytes(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.full_path(path)?;
        fs::read(&full).map_err(|e| StorageError::from_read(e, full))
    }

    fn read_text(&self, path: &str) -> StorageResult<String> {
        let full = self.full_path(path)?;
        fs::read_to_string(&full).map_err(|e| StorageError::from_read(e, full))
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn rename(&mut self, path: &str, new_path: &str) -> StorageResult<()> {
        let from = self.full_path(path)?;
        let to = self.full_path(new_path)?;

        if to.exists() {
            return Err(StorageError::AlreadyExists { path: to });
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, parent.into()))?;
        }

        fs::rename(&from, &to).map_err(|source| StorageError::RenameFailed { from, to, source })
    }

    fn delete(&mut self, path: &str) -> StorageResult<()> {
        let full = self.full_path(path)?;
        fs::remove_file(&full).map_err(|source| StorageError::DeleteFailed { path: full, source })
    }

    fn write_text(&mut self, path: &str, content: &str) -> StorageResult<()> {
        let full = self.full_path(path)?;
        atomic_write(&full, content.as_bytes())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The temp file name starts with a dot so an interrupted write never shows
/// up in a vault listing.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, parent.into()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let temp_path = parent.join(format!(".{}.tmp", file_name));

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::RenameFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source,
    })
}
