//! Filesystem blob store scheme (`file://`), one blob per file under a
//! base directory, named by content hash.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::store::{labeled_key, BlobKindHint, BlobStore, Uri};

/// A blob store backed by a directory on disk. `base_uri`s passed to
/// [`BlobStore::persist`] select a subdirectory under the store's root;
/// any overlapping subdirectories collapse onto the same physical
/// location, as `StorageSpec::single` relies on.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStore { root: root.into() }
    }

    fn resolve(&self, uri: &Uri) -> PathBuf {
        self.root.join(uri.path().trim_start_matches('/'))
    }
}

impl BlobStore for FsStore {
    fn persist(&self, base_uri: &Uri, bytes: &[u8], kind: BlobKindHint) -> Result<Uri, LogError> {
        let key = labeled_key(kind, bytes);
        let relative = Path::new(base_uri.path().trim_matches('/')).join(&key);
        let full_path = self.root.join(&relative);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LogError::storage(relative.display().to_string(), e.to_string()))?;
        }
        fs::write(&full_path, bytes)
            .map_err(|e| LogError::storage(relative.display().to_string(), e.to_string()))?;
        Ok(Uri::new(format!("file://{}", relative.display())))
    }

    fn fetch(&self, uri: &Uri) -> Result<Vec<u8>, LogError> {
        let path = self.resolve(uri);
        fs::read(&path).map_err(|e| LogError::storage(uri.as_str(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_blob_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let base = Uri::new("file:///slabs");
        let uri = store.persist(&base, b"on disk", BlobKindHint::Slab).unwrap();
        assert_eq!(store.fetch(&uri).unwrap(), b"on disk");
    }

    #[test]
    fn missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let err = store.fetch(&Uri::new("file:///nope")).unwrap_err();
        assert!(matches!(err, LogError::Storage { .. }));
    }
}
