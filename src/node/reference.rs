//! Reference: an opaque handle to a persisted node.

use bincode::{Decode, Encode};

use crate::store::Uri;

/// Which node variant a [`ReferenceNode`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum RefNodeKind {
    Slab,
    Tail,
    Tree,
}

/// An opaque pointer to a persisted node, materialized on demand via a
/// blob store and cache.
///
/// `byte_count` is the *already-adjusted* size (the referenced node's own
/// `byte_count` plus `add_ref_overhead`'s framing), set once when the
/// reference is constructed during persistence. Nothing
/// downstream re-adds the overhead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNode {
    pub uri: Uri,
    pub ref_node_kind: RefNodeKind,
    pub length: u64,
    pub byte_count: u64,
}
