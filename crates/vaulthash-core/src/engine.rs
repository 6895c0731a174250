//! Rename/merge engine
//!
//! Gives every attachment a content-addressed name and keeps every link to
//! it valid. Per attachment, in sorted path order:
//!
//! 1. skip files outside the configured extensions/folders and documents
//! 2. fingerprint the bytes; a file already named after its fingerprint is
//!    left alone
//! 3. look up referencing documents; unlinked files are left alone when
//!    `rename_only_linked_attachments` is set
//! 4. if nothing occupies the canonical path, rename and rewrite references
//! 5. if the canonical path is taken by identical content and merging is
//!    enabled, delete the duplicate and rewrite references to the survivor;
//!    otherwise report the attachment as blocked
//!
//! References are rewritten only after the storage operation succeeded. An
//! attachment is fully handled, index refresh included, before the next one
//! starts, so when two attachments share a fingerprint the first one wins the
//! rename and the second one merges into it.
//!
//! Equal fingerprints are treated as equal content. A SHA-256 collision
//! would merge two different files; that risk is accepted.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::hasher::fingerprint;
use crate::index::{document_kind, DocumentKind, LinkIndex};
use crate::paths;
use crate::report::Reporter;
use crate::rewrite::{rewrite_canvas_reference, rewrite_prose_reference};
use crate::storage::{Storage, StorageError};

/// Errors that stop an entry point before any attachment is processed
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Could not scan the vault: {0}")]
    Storage(#[from] StorageError),

    #[error("Document not found in the vault index: '{0}'")]
    UnknownDocument(String),
}

/// Policy inputs of the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineOptions {
    /// Folder prefixes whose files are never renamed
    pub ignore_folders: Vec<String>,
    /// Extensions (without dot, case-insensitive) eligible for renaming
    pub allowed_extensions: Vec<String>,
    /// Leave attachments that no document links to
    pub rename_only_linked_attachments: bool,
    /// Delete an attachment whose canonical name is already taken by
    /// identical content
    pub merge_duplicates: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ignore_folders: Vec::new(),
            allowed_extensions: default_extensions(),
            rename_only_linked_attachments: true,
            merge_duplicates: false,
        }
    }
}

/// Extensions renamed when none are configured
pub fn default_extensions() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "avif", "pdf", "mp3", "wav", "m4a",
        "ogg", "mp4", "webm", "mov",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl EngineOptions {
    fn is_ignored(&self, path: &str) -> bool {
        self.ignore_folders
            .iter()
            .any(|folder| paths::is_under(path, folder))
    }

    fn is_allowed_extension(&self, path: &str) -> bool {
        let ext = paths::extension(path);
        !ext.is_empty()
            && self
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Whether a path passes the folder/extension filters
    pub fn is_candidate(&self, path: &str) -> bool {
        document_kind(path).is_none() && !self.is_ignored(path) && self.is_allowed_extension(path)
    }
}

/// Why an attachment was left as it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// Filtered out by folder/extension policy
    Filtered,
    /// Already named after its fingerprint
    AlreadyCanonical,
    /// No document links to it and only linked attachments are renamed
    Unlinked,
}

/// Why an attachment could not be renamed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum BlockReason {
    /// Canonical path taken by a file with different content
    NameClash,
    /// Canonical path taken by identical content, merging disabled
    DuplicateMergeDisabled,
    /// Read, rename or delete failed
    StorageFailure(String),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NameClash => {
                write!(f, "a different file already uses that name")
            }
            BlockReason::DuplicateMergeDisabled => {
                write!(f, "an identical file already exists and merging is disabled")
            }
            BlockReason::StorageFailure(details) => write!(f, "{}", details),
        }
    }
}

/// Outcome for one attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RenameDecision {
    NoOp {
        path: String,
        reason: NoOpReason,
    },
    Renamed {
        from: String,
        to: String,
        documents_updated: usize,
    },
    /// The attachment was deleted in favour of an identical file
    Merged {
        from: String,
        into: String,
        documents_updated: usize,
    },
    Blocked {
        from: String,
        to: String,
        reason: BlockReason,
    },
}

impl RenameDecision {
    /// Whether a rename or merge happened
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            RenameDecision::Renamed { .. } | RenameDecision::Merged { .. }
        )
    }
}

/// Decisions of one batch, in processing order
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchReport {
    pub decisions: Vec<RenameDecision>,
}

impl BatchReport {
    /// Number of renames plus merges
    pub fn action_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_action()).count()
    }

    /// Attachments that could not be renamed
    pub fn blocked(&self) -> impl Iterator<Item = &RenameDecision> {
        self.decisions
            .iter()
            .filter(|d| matches!(d, RenameDecision::Blocked { .. }))
    }

    /// One-line summary for the user
    pub fn summary(&self) -> String {
        match self.action_count() {
            0 => "No files found that need to be renamed".to_string(),
            n => format!("Renamed {} file(s)", n),
        }
    }
}

/// Renames attachments in a vault and keeps links consistent
pub struct RenameEngine<'a, S, R>
where
    S: Storage + ?Sized,
    R: Reporter + ?Sized,
{
    storage: &'a mut S,
    reporter: &'a R,
    options: &'a EngineOptions,
    index: LinkIndex,
}

impl<'a, S, R> RenameEngine<'a, S, R>
where
    S: Storage + ?Sized,
    R: Reporter + ?Sized,
{
    /// Scan the vault and prepare an engine
    pub fn new(
        storage: &'a mut S,
        reporter: &'a R,
        options: &'a EngineOptions,
    ) -> Result<Self, EngineError> {
        let index = LinkIndex::build(&*storage, reporter)?;
        Ok(Self {
            storage,
            reporter,
            options,
            index,
        })
    }

    /// The link index as of the last processed attachment
    pub fn index(&self) -> &LinkIndex {
        &self.index
    }

    /// Attachments `rename_all` would still rename or merge
    ///
    /// Follows the same filters as a batch, including the linked-only
    /// policy. Unreadable files are left out.
    pub fn pending_attachments(&self) -> Vec<String> {
        self.index
            .attachments()
            .filter(|path| self.options.is_candidate(path))
            .filter(|path| {
                !self.options.rename_only_linked_attachments
                    || !self.index.find_referencing_documents(path).is_empty()
            })
            .filter(|path| match self.storage.read_bytes(path) {
                Ok(bytes) => {
                    !fingerprint(&bytes).matches_stem(paths::basename(path, paths::extension(path)))
                }
                Err(e) => {
                    debug!("Cannot read '{}': {}", path, e);
                    false
                }
            })
            .map(str::to_string)
            .collect()
    }

    /// Process every attachment in the vault
    pub fn rename_all(&mut self) -> BatchReport {
        let candidates: Vec<String> = self.index.attachments().map(str::to_string).collect();
        info!("Processing {} attachment(s)", candidates.len());
        self.run(candidates)
    }

    /// Process only the attachments one document links to
    pub fn rename_linked_to(&mut self, document: &str) -> Result<BatchReport, EngineError> {
        let document = document.trim_start_matches('/');
        let candidates = self
            .index
            .linked_attachments(document)
            .ok_or_else(|| EngineError::UnknownDocument(document.to_string()))?;
        info!(
            "Processing {} attachment(s) linked from '{}'",
            candidates.len(),
            document
        );
        Ok(self.run(candidates))
    }

    fn run(&mut self, candidates: Vec<String>) -> BatchReport {
        let mut report = BatchReport::default();
        for path in candidates {
            if !self.storage.exists(&path) {
                debug!("Skipping '{}': no longer exists", path);
                continue;
            }
            report.decisions.push(self.process_attachment(&path));
        }
        report
    }

    /// Decide and apply the outcome for one attachment
    pub fn process_attachment(&mut self, path: &str) -> RenameDecision {
        if !self.options.is_candidate(path) {
            return RenameDecision::NoOp {
                path: path.to_string(),
                reason: NoOpReason::Filtered,
            };
        }

        let bytes = match self.storage.read_bytes(path) {
            Ok(bytes) => bytes,
            Err(e) => return self.blocked(path, path, storage_failure(e)),
        };
        let target = fingerprint(&bytes);
        let ext = paths::extension(path);
        if target.matches_stem(paths::basename(path, ext)) {
            return RenameDecision::NoOp {
                path: path.to_string(),
                reason: NoOpReason::AlreadyCanonical,
            };
        }

        let referencing = self.index.find_referencing_documents(path);
        if referencing.is_empty() && self.options.rename_only_linked_attachments {
            debug!("Skipping '{}': not linked from any document", path);
            return RenameDecision::NoOp {
                path: path.to_string(),
                reason: NoOpReason::Unlinked,
            };
        }

        let candidate = paths::with_base_name(path, target.as_str());

        if !self.storage.exists(&candidate) {
            if let Err(e) = self.storage.rename(path, &candidate) {
                return self.blocked(path, &candidate, storage_failure(e));
            }
            let documents_updated = self.rewrite_references(&referencing, path, &candidate);
            self.index.record_rename(path, &candidate);
            self.refresh(&referencing);

            self.reporter
                .notify(&format!("Renamed '{}' to '{}'", path, candidate));
            return RenameDecision::Renamed {
                from: path.to_string(),
                to: candidate,
                documents_updated,
            };
        }

        let existing = match self.storage.read_bytes(&candidate) {
            Ok(bytes) => fingerprint(&bytes),
            Err(e) => {
                return self.blocked(path, &candidate, storage_failure(e))
            }
        };
        if existing != target {
            return self.blocked(path, &candidate, BlockReason::NameClash);
        }
        if !self.options.merge_duplicates {
            return self.blocked(path, &candidate, BlockReason::DuplicateMergeDisabled);
        }

        if let Err(e) = self.storage.delete(path) {
            return self.blocked(path, &candidate, storage_failure(e));
        }
        let documents_updated = self.rewrite_references(&referencing, path, &candidate);
        self.index.record_delete(path);
        self.refresh(&referencing);

        self.reporter
            .notify(&format!("Merged duplicate '{}' into '{}'", path, candidate));
        RenameDecision::Merged {
            from: path.to_string(),
            into: candidate,
            documents_updated,
        }
    }

    /// Point every document in `documents` from `old_path` to `new_path`
    ///
    /// Returns how many documents were written. A document that cannot be
    /// read, parsed or written is reported and skipped.
    fn rewrite_references(
        &mut self,
        documents: &BTreeSet<String>,
        old_path: &str,
        new_path: &str,
    ) -> usize {
        let resolver = self.index.resolver();
        let mut updated = 0;

        for document in documents {
            let text = match self.storage.read_text(document) {
                Ok(text) => text,
                Err(e) => {
                    self.reporter
                        .log_error(&format!("Skipping document '{}': {}", document, e));
                    continue;
                }
            };

            let rewritten = match document_kind(document) {
                Some(DocumentKind::Prose) => {
                    Ok(rewrite_prose_reference(&text, document, old_path, new_path, resolver))
                }
                Some(DocumentKind::Canvas) => {
                    rewrite_canvas_reference(&text, document, old_path, new_path, resolver)
                }
                None => Ok(None),
            };

            match rewritten {
                Ok(Some(content)) => match self.storage.write_text(document, &content) {
                    Ok(()) => {
                        debug!("Updated links in '{}'", document);
                        updated += 1;
                    }
                    Err(e) => self.reporter.log_error(&format!(
                        "Could not update links in '{}': {}",
                        document, e
                    )),
                },
                Ok(None) => {}
                Err(e) => self
                    .reporter
                    .log_error(&format!("Skipping document '{}': {}", document, e)),
            }
        }

        updated
    }

    fn refresh(&mut self, documents: &BTreeSet<String>) {
        for document in documents {
            self.index
                .reindex_document(&*self.storage, self.reporter, document);
        }
    }

    fn blocked(&self, from: &str, to: &str, reason: BlockReason) -> RenameDecision {
        self.reporter.warn(&format!(
            "Cannot rename '{}' to '{}': {}",
            from, to, reason
        ));
        RenameDecision::Blocked {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        }
    }
}

fn storage_failure(error: StorageError) -> BlockReason {
    match error.recovery_suggestion() {
        Some(hint) => BlockReason::StorageFailure(format!("{} ({})", error, hint)),
        None => BlockReason::StorageFailure(error.to_string()),
    }
}
