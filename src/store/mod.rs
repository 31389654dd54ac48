//! Durable reference store abstraction.
//!
//! An abstract store exposes `persist`/`fetch` keyed by URI; supported
//! schemes include at minimum an in-memory scheme and a filesystem
//! scheme backed by a directory.

pub mod fs;
pub mod memory;

use bincode::{Decode, Encode};

use crate::error::LogError;

/// An opaque content-addressed location, e.g. `mem://<hash>` or
/// `file:///base/dir/<hash>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode)]
pub struct Uri(pub String);

impl Uri {
    pub fn new(value: impl Into<String>) -> Self {
        Uri(value.into())
    }

    pub fn scheme(&self) -> &str {
        self.0.split("://").next().unwrap_or("")
    }

    pub fn path(&self) -> &str {
        self.0.splitn(2, "://").nth(1).unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hint passed to [`BlobStore::persist`] describing what's being written,
/// used to namespace content-addressed keys by node kind (`"tree"`,
/// `"slab"`, `"tail"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKindHint {
    Slab,
    Tail,
    Tree,
}

impl BlobKindHint {
    fn label(self) -> &'static str {
        match self {
            BlobKindHint::Slab => "slab",
            BlobKindHint::Tail => "tail",
            BlobKindHint::Tree => "tree",
        }
    }
}

/// Abstraction over a content-addressed blob store, keyed by URI rather
/// than raw bytes so a single store implementation can address multiple
/// schemes (`mem://`, `file://`, ...).
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `base_uri`, content-addressed, and return the
    /// URI it was written to.
    fn persist(&self, base_uri: &Uri, bytes: &[u8], kind: BlobKindHint) -> Result<Uri, LogError>;

    /// Read back the bytes at `uri`.
    fn fetch(&self, uri: &Uri) -> Result<Vec<u8>, LogError>;
}

/// Four base URIs for the node kinds that get persisted independently.
/// They may all point at the same physical location.
#[derive(Debug, Clone)]
pub struct StorageSpec {
    pub slab_base_uri: Uri,
    pub tree_base_uri: Uri,
    pub tail_base_uri: Uri,
    pub log_base_uri: Uri,
}

impl StorageSpec {
    /// Convenience constructor pointing every base URI at the same
    /// location.
    pub fn single(base_uri: Uri) -> Self {
        StorageSpec {
            slab_base_uri: base_uri.clone(),
            tree_base_uri: base_uri.clone(),
            tail_base_uri: base_uri.clone(),
            log_base_uri: base_uri,
        }
    }
}

pub(crate) fn content_key(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

pub(crate) fn labeled_key(kind: BlobKindHint, bytes: &[u8]) -> String {
    format!("{}/{}", kind.label(), content_key(bytes))
}
