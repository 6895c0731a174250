//! Content fingerprints
//!
//! Attachments are named after a SHA-256 digest of their bytes, rendered as
//! 64 lowercase hex characters. Only the bytes are hashed: path, timestamps
//! and other metadata never influence the result.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters
pub const FINGERPRINT_LEN: usize = 64;

/// Hex digest of a file's full byte content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The digest as a string, suitable as a filename stem
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a filename stem already equals this fingerprint
    pub fn matches_stem(&self, stem: &str) -> bool {
        self.0 == stem
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the fingerprint of a byte buffer
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint(hex::encode(hasher.finalize()))
}
