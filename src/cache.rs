//! Bounded, insertion-ordered, process-wide caches for persisted nodes.
//!
//! Each cache maps a persisted URI to the resolved in-memory value.
//! Insertion-ordered maps with eviction of the oldest entry on overflow,
//! guarded by a mutex. `IndexMap` gives insertion order and O(1) lookup
//! in one structure, which is exactly what eviction needs.

use std::sync::{Arc, Mutex, OnceLock};

use indexmap::IndexMap;

use crate::error::LogError;
use crate::node::{ReferenceNode, SlabNode, TailNode, TreeNode};
use crate::store::BlobStore;
use crate::wire;

const SLAB_CACHE_CAPACITY: usize = 64;
const TAIL_CACHE_CAPACITY: usize = 64;
const TREE_CACHE_CAPACITY: usize = 128;

struct BoundedCache<V> {
    capacity: usize,
    entries: IndexMap<String, Arc<V>>,
}

impl<V> BoundedCache<V> {
    fn new(capacity: usize) -> Self {
        BoundedCache {
            capacity,
            entries: IndexMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: Arc<V>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(key, value);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

static SLAB_CACHE: OnceLock<Mutex<BoundedCache<SlabNode>>> = OnceLock::new();
static TAIL_CACHE: OnceLock<Mutex<BoundedCache<TailNode>>> = OnceLock::new();
static TREE_CACHE: OnceLock<Mutex<BoundedCache<TreeNode>>> = OnceLock::new();

fn slab_cache() -> &'static Mutex<BoundedCache<SlabNode>> {
    SLAB_CACHE.get_or_init(|| Mutex::new(BoundedCache::new(SLAB_CACHE_CAPACITY)))
}

fn tail_cache() -> &'static Mutex<BoundedCache<TailNode>> {
    TAIL_CACHE.get_or_init(|| Mutex::new(BoundedCache::new(TAIL_CACHE_CAPACITY)))
}

fn tree_cache() -> &'static Mutex<BoundedCache<TreeNode>> {
    TREE_CACHE.get_or_init(|| Mutex::new(BoundedCache::new(TREE_CACHE_CAPACITY)))
}

/// Current occupancy of the three caches, exposed for tests and
/// diagnostics.
pub fn cache_sizes() -> (usize, usize, usize) {
    (
        slab_cache().lock().unwrap().len(),
        tail_cache().lock().unwrap().len(),
        tree_cache().lock().unwrap().len(),
    )
}

/// Drop every cached entry. Safe at any time: caches only affect
/// performance, never correctness.
pub fn clear_all() {
    slab_cache().lock().unwrap().entries.clear();
    tail_cache().lock().unwrap().entries.clear();
    tree_cache().lock().unwrap().entries.clear();
}

fn require_store<'a>(
    store: Option<&'a dyn BlobStore>,
    uri: &str,
) -> Result<&'a dyn BlobStore, LogError> {
    store.ok_or_else(|| {
        LogError::storage(uri, "reference encountered but no blob store was supplied")
    })
}

/// Materialize a slab reference, consulting and populating the process
/// cache.
pub(crate) fn resolve_slab(
    reference: &ReferenceNode,
    store: Option<&dyn BlobStore>,
) -> Result<Arc<SlabNode>, LogError> {
    let key = reference.uri.as_str().to_string();
    if let Some(hit) = slab_cache().lock().unwrap().get(&key) {
        return Ok(hit);
    }
    let store = require_store(store, &key)?;
    let bytes = store.fetch(&reference.uri)?;
    let slab = Arc::new(wire::decode_slab(&bytes)?);
    slab_cache().lock().unwrap().insert(key, Arc::clone(&slab));
    Ok(slab)
}

/// Materialize a tail reference.
pub(crate) fn resolve_tail(
    reference: &ReferenceNode,
    store: Option<&dyn BlobStore>,
) -> Result<Arc<TailNode>, LogError> {
    let key = reference.uri.as_str().to_string();
    if let Some(hit) = tail_cache().lock().unwrap().get(&key) {
        return Ok(hit);
    }
    let store = require_store(store, &key)?;
    let bytes = store.fetch(&reference.uri)?;
    let tail = Arc::new(wire::decode_tail(&bytes)?);
    tail_cache().lock().unwrap().insert(key, Arc::clone(&tail));
    Ok(tail)
}

/// Materialize a tree reference.
pub(crate) fn resolve_tree(
    reference: &ReferenceNode,
    store: Option<&dyn BlobStore>,
) -> Result<Arc<TreeNode>, LogError> {
    let key = reference.uri.as_str().to_string();
    if let Some(hit) = tree_cache().lock().unwrap().get(&key) {
        return Ok(hit);
    }
    let store = require_store(store, &key)?;
    let bytes = store.fetch(&reference.uri)?;
    let tree = Arc::new(wire::decode_tree(&bytes, store)?);
    tree_cache().lock().unwrap().insert(key, Arc::clone(&tree));
    Ok(tree)
}
