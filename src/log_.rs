//! The log's public append surface.
//!
//! Named `log_` rather than `log` to avoid shadowing the crate name when
//! re-exported at the root.

use std::sync::Arc;

use crate::cache;
use crate::config::LogOptions;
use crate::error::LogError;
use crate::node::buffer::{buffer, AppendInput};
use crate::node::slab::node_to_slab;
use crate::node::tail::{add_to_tail, empty_tail};
use crate::node::tree::{empty_tree, push_slab};
use crate::node::{LogNode, Node, TreeNode};
use crate::store::BlobStore;

/// Build a fresh, empty log from validated options.
pub fn empty_log(opts: LogOptions) -> Result<LogNode, LogError> {
    let opts = opts.validate()?;
    let root = Node::Tree(Arc::new(empty_tree(opts.branching_factor)));
    let tail = Arc::new(empty_tail(opts.max_inline_bytes));
    Ok(LogNode::recompute(root, tail, opts.optimal_slab_bytes))
}

fn unref_tree(root: &Node, store: Option<&dyn BlobStore>) -> Result<Arc<TreeNode>, LogError> {
    match root {
        Node::Tree(tree) => Ok(Arc::clone(tree)),
        Node::Reference(reference) => cache::resolve_tree(reference, store),
        other => Err(LogError::InvariantViolation(format!(
            "log root must be a tree or a tree reference, got {}",
            other.kind_name()
        ))),
    }
}

/// Append a value to the log, sealing the tail into the tree as many
/// times as necessary. `store` supplies the blob store
/// needed to `unref` an already-persisted root; pass `None` for a log
/// whose root has never been persisted.
pub fn append(
    log: LogNode,
    input: impl Into<AppendInput>,
    store: Option<&dyn BlobStore>,
) -> Result<LogNode, LogError> {
    let node = match input.into() {
        AppendInput::Node(n) => n,
        other => buffer(other),
    };
    append_node(log, node, store)
}

fn append_node(log: LogNode, node: Node, store: Option<&dyn BlobStore>) -> Result<LogNode, LogError> {
    if log.tail.byte_count >= log.optimal_slab_bytes {
        let sealed_slab = node_to_slab(&Node::Tail(Arc::clone(&log.tail)))?;
        let current_root = unref_tree(&log.root, store)?;
        let new_root = push_slab(&current_root, Arc::new(sealed_slab), store)?;
        let new_tail = Arc::new(empty_tail(log.tail.max_inline_bytes));
        let sealed_log = LogNode::recompute(Node::Tree(Arc::new(new_root)), new_tail, log.optimal_slab_bytes);
        append_node(sealed_log, node, store)
    } else {
        let new_tail = Arc::new(add_to_tail(&log.tail, AppendInput::Node(node), store)?);
        Ok(LogNode::recompute(log.root.clone(), new_tail, log.optimal_slab_bytes))
    }
}
