//! Storage layer
//!
//! The engine reaches the vault only through the [`Storage`] trait. Paths
//! are vault-relative with forward slashes.
//!
//! ## Implementations
//!
//! - [`FsStorage`]: a vault directory on the local filesystem
//! - `MemoryStorage` (tests only): an in-memory vault with failure injection

pub mod error;
pub mod fs;
#[cfg(test)]
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use fs::FsStorage;

/// File access needed by the indexer and the rename engine
pub trait Storage {
    /// Every file in the vault, sorted by path
    fn list_all_files(&self) -> StorageResult<Vec<String>>;

    /// Full byte content of a file
    fn read_bytes(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Content of a text file; non-UTF-8 content is an error
    fn read_text(&self, path: &str) -> StorageResult<String>;

    /// Whether a file exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Move a file; fails if `new_path` is already taken
    fn rename(&mut self, path: &str, new_path: &str) -> StorageResult<()>;

    /// Remove a file
    fn delete(&mut self, path: &str) -> StorageResult<()>;

    /// Replace the content of a text file
    fn write_text(&mut self, path: &str, content: &str) -> StorageResult<()>;
}
