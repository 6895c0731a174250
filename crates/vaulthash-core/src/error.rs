//! Document errors
//!
//! Raised when a prose or canvas document cannot be read or parsed. These
//! never abort a batch: the document is skipped and the failure reported.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while reading or parsing a document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Could not read document: {0}")]
    Read(#[from] StorageError),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid canvas: {0}")]
    InvalidCanvas(String),

    #[error("Document is not valid UTF-8")]
    NotUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocumentError::InvalidCanvas("'nodes' is not an array".to_string());
        assert_eq!(err.to_string(), "Invalid canvas: 'nodes' is not an array");

        let err = DocumentError::from(StorageError::NotFound {
            path: "a.md".into(),
        });
        assert!(err.to_string().contains("a.md"));
    }
}
