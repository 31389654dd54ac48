//! The node algebra: the tagged sum of immutable value types that make
//! up a log.

pub mod buffer;
pub mod reference;
pub mod slab;
pub mod tail;
pub mod tree;

use std::sync::Arc;

pub use buffer::{AppendInput, BufferKind, BufferNode};
pub use reference::{RefNodeKind, ReferenceNode};
pub use slab::SlabNode;
pub use tail::TailNode;
pub use tree::{ElementValue, TreeElement, TreeNode};

use crate::codec::LOG_OVERHEAD;

/// The root container pairing a tree root with a live tail.
///
/// A `Log` is itself a node variant: a whole log can be pushed into
/// another log as a single `embedded_node` buffer, or merged
/// structurally via [`tail::add_to_tail`].
#[derive(Debug, Clone)]
pub struct LogNode {
    /// Either `Node::Tree` or `Node::Reference` wrapping a tree.
    pub root: Node,
    pub tail: Arc<TailNode>,
    pub optimal_slab_bytes: u64,
    pub length: u64,
    pub byte_count: u64,
}

impl LogNode {
    pub(crate) fn recompute(root: Node, tail: Arc<TailNode>, optimal_slab_bytes: u64) -> Self {
        let length = root.length() + tail.length;
        let byte_count = LOG_OVERHEAD as u64 + root.byte_count() + tail.byte_count;
        LogNode {
            root,
            tail,
            optimal_slab_bytes,
            length,
            byte_count,
        }
    }
}

/// Every node variant: leaf buffers, sealed slabs, the mutable tail,
/// internal trees, persisted references, and whole logs.
#[derive(Debug, Clone)]
pub enum Node {
    Buffer(Arc<BufferNode>),
    Slab(Arc<SlabNode>),
    Tail(Arc<TailNode>),
    Tree(Arc<TreeNode>),
    Reference(Arc<ReferenceNode>),
    Log(Arc<LogNode>),
}

impl Node {
    pub fn length(&self) -> u64 {
        match self {
            Node::Buffer(b) => b.length,
            Node::Slab(s) => s.length,
            Node::Tail(t) => t.length,
            Node::Tree(t) => t.length,
            Node::Reference(r) => r.length,
            Node::Log(l) => l.length,
        }
    }

    pub fn byte_count(&self) -> u64 {
        match self {
            Node::Buffer(b) => b.byte_count(),
            Node::Slab(s) => s.byte_count,
            Node::Tail(t) => t.byte_count,
            Node::Tree(t) => t.byte_count,
            Node::Reference(r) => r.byte_count,
            Node::Log(l) => l.byte_count,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Buffer(_) => "buffer",
            Node::Slab(_) => "slab",
            Node::Tail(_) => "tail",
            Node::Tree(_) => "tree",
            Node::Reference(r) => match r.ref_node_kind {
                RefNodeKind::Slab => "reference(slab)",
                RefNodeKind::Tail => "reference(tail)",
                RefNodeKind::Tree => "reference(tree)",
            },
            Node::Log(_) => "log",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }
}
