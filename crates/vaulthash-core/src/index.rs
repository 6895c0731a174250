//! Link index
//!
//! One scan over the vault produces, for every prose and canvas document,
//! the list of links it contains and the vault path each one resolves to.
//! A reverse map (target → documents) answers "who references this file"
//! without rescanning. The engine keeps the index current by recording
//! renames/deletes and re-indexing the documents it rewrites.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::canvas::{Canvas, FileNode};
use crate::error::DocumentError;
use crate::links::{parse_links, split_fragment, LinkOccurrence};
use crate::paths;
use crate::report::Reporter;
use crate::storage::{Storage, StorageResult};

/// Extension of prose documents
pub const PROSE_EXTENSION: &str = "md";
/// Extension of canvas documents
pub const CANVAS_EXTENSION: &str = "canvas";

/// The two document formats that can reference attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Prose,
    Canvas,
}

/// Classify a path as a document, or `None` for attachments
pub fn document_kind(path: &str) -> Option<DocumentKind> {
    match paths::extension(path) {
        PROSE_EXTENSION => Some(DocumentKind::Prose),
        CANVAS_EXTENSION => Some(DocumentKind::Canvas),
        _ => None,
    }
}

/// Resolves link text to a vault path
pub trait LinkResolver {
    /// Resolve `link_text` as written in `containing_document`
    ///
    /// Returns `None` when nothing in the vault matches.
    fn resolve_link_to_path(&self, link_text: &str, containing_document: &str) -> Option<String>;
}

/// Resolver over the set of files in the vault
///
/// Resolution order:
/// 1. relative to the containing document's folder
/// 2. vault-root absolute
/// 3. for a bare file name, any file with that name; the shortest path
///    wins, ties broken lexicographically
///
/// Link text without an extension also tries the `.md` document of that
/// name.
#[derive(Debug, Default, Clone)]
pub struct VaultResolver {
    files: BTreeSet<String>,
    by_name: HashMap<String, BTreeSet<String>>,
}

impl VaultResolver {
    pub fn new(files: impl IntoIterator<Item = String>) -> Self {
        let mut resolver = Self::default();
        for file in files {
            resolver.add(&file);
        }
        resolver
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn add(&mut self, path: &str) {
        self.files.insert(path.to_string());
        self.by_name
            .entry(paths::file_name(path).to_string())
            .or_default()
            .insert(path.to_string());
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
        let name = paths::file_name(path);
        if let Some(set) = self.by_name.get_mut(name) {
            set.remove(path);
            if set.is_empty() {
                self.by_name.remove(name);
            }
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    fn resolve_candidate(&self, candidate: &str, containing_document: &str) -> Option<String> {
        let relative = paths::resolve_relative(candidate, containing_document);
        if self.files.contains(&relative) {
            return Some(relative);
        }

        let absolute = paths::resolve_relative(&format!("/{}", candidate), containing_document);
        if self.files.contains(&absolute) {
            return Some(absolute);
        }

        if candidate.contains('/') {
            return None;
        }
        self.by_name
            .get(candidate)?
            .iter()
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .cloned()
    }
}

impl LinkResolver for VaultResolver {
    fn resolve_link_to_path(&self, link_text: &str, containing_document: &str) -> Option<String> {
        let path = split_fragment(link_text).0.trim();
        if path.is_empty() || paths::is_remote(path) {
            return None;
        }

        if let Some(found) = self.resolve_candidate(path, containing_document) {
            return Some(found);
        }
        if paths::extension(path).is_empty() {
            let with_ext = format!("{}.{}", path, PROSE_EXTENSION);
            return self.resolve_candidate(&with_ext, containing_document);
        }
        None
    }
}

/// A prose link together with the path it resolves to
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLink {
    pub occurrence: LinkOccurrence,
    pub target: Option<String>,
}

/// A canvas file node together with the path it resolves to
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedNode {
    pub node: FileNode,
    pub target: Option<String>,
}

#[derive(Debug, Clone)]
enum IndexedDocument {
    Prose(Vec<ResolvedLink>),
    Canvas(Vec<ResolvedNode>),
}

impl IndexedDocument {
    fn targets(&self) -> Vec<&str> {
        match self {
            IndexedDocument::Prose(links) => {
                links.iter().filter_map(|l| l.target.as_deref()).collect()
            }
            IndexedDocument::Canvas(nodes) => {
                nodes.iter().filter_map(|n| n.target.as_deref()).collect()
            }
        }
    }
}

/// Resolved-link cache for every document in the vault
#[derive(Debug, Default)]
pub struct LinkIndex {
    resolver: VaultResolver,
    documents: BTreeMap<String, IndexedDocument>,
    backlinks: HashMap<String, BTreeSet<String>>,
}

impl LinkIndex {
    /// Scan the vault and index every document
    ///
    /// Documents that cannot be read or parsed are reported and left out;
    /// only a failure to list the vault is an error.
    pub fn build<S, R>(storage: &S, reporter: &R) -> StorageResult<Self>
    where
        S: Storage + ?Sized,
        R: Reporter + ?Sized,
    {
        let files = storage.list_all_files()?;
        let mut index = Self {
            resolver: VaultResolver::new(files.iter().cloned()),
            ..Self::default()
        };

        for path in files.iter().filter(|p| document_kind(p).is_some()) {
            index.reindex_document(storage, reporter, path);
        }

        debug!(
            "Indexed {} documents out of {} files",
            index.documents.len(),
            files.len()
        );
        Ok(index)
    }

    /// The resolver backing this index
    pub fn resolver(&self) -> &VaultResolver {
        &self.resolver
    }

    /// Re-read and re-index one document
    ///
    /// On failure the document is dropped from the index and the failure is
    /// reported through `log_error`.
    pub fn reindex_document<S, R>(&mut self, storage: &S, reporter: &R, path: &str)
    where
        S: Storage + ?Sized,
        R: Reporter + ?Sized,
    {
        self.forget_document(path);
        match self.load_document(storage, path) {
            Ok(Some(doc)) => {
                for target in doc.targets() {
                    self.backlinks
                        .entry(target.to_string())
                        .or_default()
                        .insert(path.to_string());
                }
                self.documents.insert(path.to_string(), doc);
            }
            Ok(None) => {}
            Err(e) => reporter.log_error(&format!("Skipping document '{}': {}", path, e)),
        }
    }

    /// Record that a file moved; documents linking to it must be re-indexed
    /// by the caller
    pub fn record_rename(&mut self, old_path: &str, new_path: &str) {
        self.resolver.remove(old_path);
        self.resolver.add(new_path);
    }

    /// Record that a file was deleted
    pub fn record_delete(&mut self, path: &str) {
        self.resolver.remove(path);
        self.forget_document(path);
    }

    /// Documents (prose and canvas) that link to `attachment_path`
    pub fn find_referencing_documents(&self, attachment_path: &str) -> BTreeSet<String> {
        self.backlinks
            .get(attachment_path)
            .cloned()
            .unwrap_or_default()
    }

    /// Occurrences in a prose document that point at `attachment_path` and
    /// carry no custom display text
    pub fn extract_occurrences(
        &self,
        prose_document: &str,
        attachment_path: &str,
    ) -> Vec<LinkOccurrence> {
        match self.documents.get(prose_document) {
            Some(IndexedDocument::Prose(links)) => links
                .iter()
                .filter(|l| l.target.as_deref() == Some(attachment_path))
                .filter(|l| !l.occurrence.has_custom_display())
                .map(|l| l.occurrence.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// File nodes of a canvas document as `(node id, file path)`
    pub fn extract_file_nodes(&self, canvas_document: &str) -> Vec<(String, String)> {
        match self.documents.get(canvas_document) {
            Some(IndexedDocument::Canvas(nodes)) => nodes
                .iter()
                .map(|n| (n.node.id.clone(), n.node.file.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Resolved links of an indexed prose document
    pub fn prose_links(&self, document: &str) -> Option<&[ResolvedLink]> {
        match self.documents.get(document) {
            Some(IndexedDocument::Prose(links)) => Some(links),
            _ => None,
        }
    }

    /// Non-document files a document links to, in order of first appearance
    ///
    /// Returns `None` if the document is not in the index.
    pub fn linked_attachments(&self, document: &str) -> Option<Vec<String>> {
        let doc = self.documents.get(document)?;
        let mut seen = BTreeSet::new();
        Some(
            doc.targets()
                .into_iter()
                .filter(|t| document_kind(t).is_none())
                .filter(|t| seen.insert(t.to_string()))
                .map(str::to_string)
                .collect(),
        )
    }

    /// Whether a document is in the index
    pub fn contains_document(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }

    /// Number of indexed documents
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Vault files that are not documents
    pub fn attachments(&self) -> impl Iterator<Item = &str> {
        self.resolver.files().filter(|p| document_kind(p).is_none())
    }

    fn forget_document(&mut self, path: &str) {
        let Some(doc) = self.documents.remove(path) else {
            return;
        };
        for target in doc.targets() {
            if let Some(set) = self.backlinks.get_mut(target) {
                set.remove(path);
                if set.is_empty() {
                    self.backlinks.remove(target);
                }
            }
        }
    }

    fn load_document<S>(
        &self,
        storage: &S,
        path: &str,
    ) -> Result<Option<IndexedDocument>, DocumentError>
    where
        S: Storage + ?Sized,
    {
        let Some(kind) = document_kind(path) else {
            return Ok(None);
        };
        let text = storage.read_text(path)?;

        let doc = match kind {
            DocumentKind::Prose => IndexedDocument::Prose(
                parse_links(&text)
                    .into_iter()
                    .map(|occurrence| ResolvedLink {
                        target: self.resolver.resolve_link_to_path(&occurrence.link, path),
                        occurrence,
                    })
                    .collect(),
            ),
            DocumentKind::Canvas => IndexedDocument::Canvas(
                Canvas::parse(&text)?
                    .file_nodes()
                    .into_iter()
                    .map(|node| ResolvedNode {
                        target: self.resolver.resolve_link_to_path(&node.file, path),
                        node,
                    })
                    .collect(),
            ),
        };
        Ok(Some(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::recording::RecordingReporter;
    use crate::storage::memory::MemoryStorage;

    fn resolver(files: &[&str]) -> VaultResolver {
        VaultResolver::new(files.iter().map(|f| f.to_string()))
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(document_kind("a/b.md"), Some(DocumentKind::Prose));
        assert_eq!(document_kind("board.canvas"), Some(DocumentKind::Canvas));
        assert_eq!(document_kind("img.png"), None);
    }

    #[test]
    fn test_resolve_relative_first() {
        let r = resolver(&["notes/img.png", "img.png"]);
        assert_eq!(
            r.resolve_link_to_path("img.png", "notes/n.md").as_deref(),
            Some("notes/img.png")
        );
        assert_eq!(
            r.resolve_link_to_path("img.png", "n.md").as_deref(),
            Some("img.png")
        );
    }

    #[test]
    fn test_resolve_vault_absolute() {
        let r = resolver(&["assets/img.png"]);
        assert_eq!(
            r.resolve_link_to_path("assets/img.png", "notes/deep/n.md").as_deref(),
            Some("assets/img.png")
        );
        assert_eq!(
            r.resolve_link_to_path("/assets/img.png", "notes/deep/n.md").as_deref(),
            Some("assets/img.png")
        );
    }

    #[test]
    fn test_resolve_bare_name_prefers_shortest_path() {
        let r = resolver(&["z/deeper/img.png", "b/img.png", "a/img.png"]);
        assert_eq!(
            r.resolve_link_to_path("img.png", "notes/n.md").as_deref(),
            Some("a/img.png")
        );
    }

    #[test]
    fn test_resolve_strips_fragment_and_adds_md() {
        let r = resolver(&["docs/report.pdf", "Other Note.md"]);
        assert_eq!(
            r.resolve_link_to_path("report.pdf#page=3", "n.md").as_deref(),
            Some("docs/report.pdf")
        );
        assert_eq!(
            r.resolve_link_to_path("Other Note#Heading", "n.md").as_deref(),
            Some("Other Note.md")
        );
    }

    #[test]
    fn test_resolve_unresolved_and_remote() {
        let r = resolver(&["img.png"]);
        assert_eq!(r.resolve_link_to_path("missing.png", "n.md"), None);
        assert_eq!(r.resolve_link_to_path("https://x.org/img.png", "n.md"), None);
        assert_eq!(r.resolve_link_to_path("#heading", "n.md"), None);
    }

    #[test]
    fn test_resolver_remove() {
        let mut r = resolver(&["a/img.png", "b/img.png"]);
        r.remove("a/img.png");
        assert_eq!(
            r.resolve_link_to_path("img.png", "n.md").as_deref(),
            Some("b/img.png")
        );
        assert!(!r.contains("a/img.png"));
    }

    fn sample_vault() -> MemoryStorage {
        MemoryStorage::new()
            .with_file("img.png", b"png")
            .with_file("assets/diagram.pdf", b"pdf")
            .with_file(
                "note.md",
                "![](img.png) and [img.png](img.png) and [custom](img.png) and [[img.png]]",
            )
            .with_file("sub/other.md", "![[diagram.pdf]] ![](../img.png)")
            .with_file(
                "board.canvas",
                r#"{"nodes":[{"id":"a","type":"file","file":"assets/diagram.pdf"},{"id":"b","type":"text","text":"x"}]}"#,
            )
            .with_file("broken.canvas", "{ not json")
    }

    #[test]
    fn test_find_referencing_documents_across_kinds() {
        let storage = sample_vault();
        let reporter = RecordingReporter::default();
        let index = LinkIndex::build(&storage, &reporter).unwrap();

        let refs = index.find_referencing_documents("img.png");
        assert_eq!(
            refs.into_iter().collect::<Vec<_>>(),
            vec!["note.md", "sub/other.md"]
        );

        let refs = index.find_referencing_documents("assets/diagram.pdf");
        assert_eq!(
            refs.into_iter().collect::<Vec<_>>(),
            vec!["board.canvas", "sub/other.md"]
        );

        assert!(index.find_referencing_documents("nothing.png").is_empty());
    }

    #[test]
    fn test_broken_document_is_reported_and_skipped() {
        let storage = sample_vault();
        let reporter = RecordingReporter::default();
        let index = LinkIndex::build(&storage, &reporter).unwrap();

        assert!(!index.contains_document("broken.canvas"));
        assert_eq!(index.document_count(), 3);
        let errors = reporter.errors.borrow();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("broken.canvas"));
    }

    #[test]
    fn test_extract_occurrences_excludes_custom_display() {
        let storage = sample_vault();
        let reporter = RecordingReporter::default();
        let index = LinkIndex::build(&storage, &reporter).unwrap();

        let occurrences = index.extract_occurrences("note.md", "img.png");
        assert_eq!(occurrences.len(), 3);
        assert!(occurrences.iter().all(|o| !o.has_custom_display()));
        assert!(index.extract_occurrences("board.canvas", "img.png").is_empty());
    }

    #[test]
    fn test_extract_file_nodes() {
        let storage = sample_vault();
        let reporter = RecordingReporter::default();
        let index = LinkIndex::build(&storage, &reporter).unwrap();

        assert_eq!(
            index.extract_file_nodes("board.canvas"),
            vec![("a".to_string(), "assets/diagram.pdf".to_string())]
        );
    }

    #[test]
    fn test_linked_attachments_in_order() {
        let storage = sample_vault();
        let reporter = RecordingReporter::default();
        let index = LinkIndex::build(&storage, &reporter).unwrap();

        assert_eq!(
            index.linked_attachments("sub/other.md").unwrap(),
            vec!["assets/diagram.pdf", "img.png"]
        );
        assert_eq!(index.linked_attachments("note.md").unwrap(), vec!["img.png"]);
        assert!(index.linked_attachments("missing.md").is_none());
    }

    #[test]
    fn test_reindex_after_edit_updates_backlinks() {
        let mut storage = sample_vault();
        let reporter = RecordingReporter::default();
        let mut index = LinkIndex::build(&storage, &reporter).unwrap();

        storage.write_text("note.md", "no links any more").unwrap();
        index.reindex_document(&storage, &reporter, "note.md");

        let refs = index.find_referencing_documents("img.png");
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec!["sub/other.md"]);
    }

    #[test]
    fn test_attachments_excludes_documents() {
        let storage = sample_vault();
        let reporter = RecordingReporter::default();
        let index = LinkIndex::build(&storage, &reporter).unwrap();

        let attachments: Vec<&str> = index.attachments().collect();
        assert_eq!(attachments, vec!["assets/diagram.pdf", "img.png"]);
    }

    #[test]
    fn test_prose_links_carry_resolved_targets() {
        let storage = sample_vault();
        let reporter = RecordingReporter::default();
        let index = LinkIndex::build(&storage, &reporter).unwrap();

        let links = index.prose_links("sub/other.md").unwrap();
        let targets: Vec<Option<&str>> = links.iter().map(|l| l.target.as_deref()).collect();
        assert_eq!(targets, vec![Some("assets/diagram.pdf"), Some("img.png")]);
        assert!(index.prose_links("board.canvas").is_none());
    }
}
