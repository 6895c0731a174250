//! vaulthash core library
//!
//! Renames the attachments of a note vault (images, PDFs, audio) to a
//! fingerprint of their content and keeps every link to them valid. Two
//! byte-identical attachments end up as one file.
//!
//! # Architecture
//!
//! - **Storage**: file access behind a trait, filesystem or in-memory
//! - **LinkIndex**: one scan of the vault; resolved links per document and
//!   the reverse "who links here" map
//! - **RenameEngine**: per-attachment rename/merge decision, then reference
//!   rewriting in prose and canvas documents
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let options = config.engine_options();
//! let mut storage = FsStorage::open(config.vault_path())?;
//!
//! let mut engine = RenameEngine::new(&mut storage, &TracingReporter, &options)?;
//! let report = engine.rename_all();
//! println!("{}", report.summary());
//! ```
//!
//! # Modules
//!
//! - `hasher`: content fingerprints
//! - `paths`: vault path manipulation
//! - `links`: link parsing in prose documents
//! - `canvas`: canvas (JSON) documents
//! - `index`: link resolution and the vault link index
//! - `rewrite`: redirecting references inside a document
//! - `engine`: the rename/merge engine
//! - `storage`: vault file access
//! - `report`: user-facing notices
//! - `config`: application configuration

pub mod canvas;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod index;
pub mod links;
pub mod paths;
pub mod report;
pub mod rewrite;
pub mod storage;

pub use config::Config;
pub use engine::{
    BatchReport, BlockReason, EngineError, EngineOptions, NoOpReason, RenameDecision,
    RenameEngine,
};
pub use error::DocumentError;
pub use hasher::{fingerprint, Fingerprint};
pub use index::{document_kind, DocumentKind, LinkIndex, LinkResolver, VaultResolver};
pub use report::{Reporter, TracingReporter};
pub use storage::{FsStorage, Storage, StorageError, StorageResult};
