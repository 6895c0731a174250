//! In-memory vault for tests

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::PathBuf;

use super::{Storage, StorageError, StorageResult};

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    files: BTreeMap<String, Vec<u8>>,
    fail_rename: HashSet<String>,
    fail_delete: HashSet<String>,
    fail_write: HashSet<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&mut self, path: &str, data: impl AsRef<[u8]>) {
        self.files.insert(path.to_string(), data.as_ref().to_vec());
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.files
            .get(path)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn bytes(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn fail_rename_of(&mut self, path: &str) {
        self.fail_rename.insert(path.to_string());
    }

    pub fn fail_delete_of(&mut self, path: &str) {
        self.fail_delete.insert(path.to_string());
    }

    pub fn fail_write_of(&mut self, path: &str) {
        self.fail_write.insert(path.to_string());
    }
}

fn denied() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "injected failure")
}

impl Storage for MemoryStorage {
    fn list_all_files(&self) -> StorageResult<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_bytes(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound { path: path.into() })
    }

    fn read_text(&self, path: &str) -> StorageResult<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|_| StorageError::InvalidEncoding { path: path.into() })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn rename(&mut self, path: &str, new_path: &str) -> StorageResult<()> {
        if self.fail_rename.contains(path) {
            return Err(StorageError::RenameFailed {
                from: PathBuf::from(path),
                to: PathBuf::from(new_path),
                source: denied(),
            });
        }
        if self.files.contains_key(new_path) {
            return Err(StorageError::AlreadyExists {
                path: new_path.into(),
            });
        }
        let data = self
            .files
            .remove(path)
            .ok_or_else(|| StorageError::NotFound { path: path.into() })?;
        self.files.insert(new_path.to_string(), data);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> StorageResult<()> {
        if self.fail_delete.contains(path) {
            return Err(StorageError::DeleteFailed {
                path: path.into(),
                source: denied(),
            });
        }
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound { path: path.into() })
    }

    fn write_text(&mut self, path: &str, content: &str) -> StorageResult<()> {
        if self.fail_write.contains(path) {
            return Err(StorageError::WriteError {
                path: path.into(),
                source: denied(),
            });
        }
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        Ok(())
    }
}
