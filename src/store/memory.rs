//! In-memory blob store scheme (`mem://`).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::LogError;
use crate::store::{labeled_key, BlobKindHint, BlobStore, Uri};

/// An in-process blob store backed by a `HashMap`. Useful for tests and
/// for processes that persist a log only for the lifetime of the
/// process (e.g. to exercise the reference/cache machinery without
/// touching disk).
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            blobs: Mutex::new(HashMap::new()),
        }
    }
}

impl BlobStore for MemoryStore {
    fn persist(&self, base_uri: &Uri, bytes: &[u8], kind: BlobKindHint) -> Result<Uri, LogError> {
        let key = labeled_key(kind, bytes);
        let uri = Uri::new(format!("mem://{}/{}", base_uri.path().trim_matches('/'), key));
        self.blobs
            .lock()
            .map_err(|_| LogError::storage(uri.as_str(), "memory store mutex poisoned"))?
            .insert(uri.as_str().to_string(), bytes.to_vec());
        Ok(uri)
    }

    fn fetch(&self, uri: &Uri) -> Result<Vec<u8>, LogError> {
        self.blobs
            .lock()
            .map_err(|_| LogError::storage(uri.as_str(), "memory store mutex poisoned"))?
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| LogError::storage(uri.as_str(), "no such blob"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_blob() {
        let store = MemoryStore::new();
        let base = Uri::new("mem://base");
        let uri = store.persist(&base, b"hello", BlobKindHint::Slab).unwrap();
        assert_eq!(store.fetch(&uri).unwrap(), b"hello");
    }

    #[test]
    fn fetching_an_unknown_uri_errors() {
        let store = MemoryStore::new();
        let err = store.fetch(&Uri::new("mem://base/missing")).unwrap_err();
        assert!(matches!(err, LogError::Storage { .. }));
    }

    #[test]
    fn same_bytes_share_a_content_address() {
        let store = MemoryStore::new();
        let base = Uri::new("mem://base");
        let uri_a = store.persist(&base, b"same", BlobKindHint::Slab).unwrap();
        let uri_b = store.persist(&base, b"same", BlobKindHint::Slab).unwrap();
        assert_eq!(uri_a, uri_b);
    }
}
