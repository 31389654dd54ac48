//! Persistence walk: rewrites in-memory subtrees into
//! references by writing them to a blob store, with bounded parallel
//! fan-out over siblings via `std::thread::scope`.

use std::sync::Arc;

use crate::codec::{self, TREE_ELEMENT_OVERHEAD, TREE_OVERHEAD};
use crate::error::LogError;
use crate::node::{ElementValue, LogNode, Node, RefNodeKind, ReferenceNode, SlabNode, TailNode, TreeElement, TreeNode};
use crate::store::{BlobKindHint, BlobStore, StorageSpec};
use crate::wire;

fn persist_slab(slab: &Arc<SlabNode>, spec: &StorageSpec, store: &dyn BlobStore) -> Result<ReferenceNode, LogError> {
    let bytes = wire::encode_slab(slab);
    let uri = store.persist(&spec.slab_base_uri, &bytes, BlobKindHint::Slab)?;
    Ok(ReferenceNode {
        uri,
        ref_node_kind: RefNodeKind::Slab,
        length: slab.length,
        byte_count: codec::add_ref_overhead(slab.byte_count),
    })
}

fn persist_element(element: &TreeElement, spec: &StorageSpec, store: &dyn BlobStore) -> Result<TreeElement, LogError> {
    let new_value = persist_element_value(&element.value, spec, store)?;
    Ok(TreeElement {
        offset: element.offset,
        length: element.length,
        byte_count: new_value.byte_count(),
        nslabs: element.nslabs,
        value: new_value,
    })
}

fn persist_element_value(
    value: &ElementValue,
    spec: &StorageSpec,
    store: &dyn BlobStore,
) -> Result<ElementValue, LogError> {
    match value {
        ElementValue::Slab(slab) => {
            let reference = persist_slab(slab, spec, store)?;
            Ok(ElementValue::SlabRef(Arc::new(reference)))
        }
        ElementValue::SlabRef(reference) => Ok(ElementValue::SlabRef(Arc::clone(reference))),
        ElementValue::Tree(tree) => match persist_tree_value(tree, spec, store)? {
            Node::Tree(unchanged) => Ok(ElementValue::Tree(unchanged)),
            Node::Reference(reference) => Ok(ElementValue::TreeRef(reference)),
            other => Err(LogError::InvariantViolation(format!(
                "persisting a tree element must yield a tree or a reference, got {}",
                other.kind_name()
            ))),
        },
        ElementValue::TreeRef(reference) => Ok(ElementValue::TreeRef(Arc::clone(reference))),
    }
}

fn persist_elements_parallel(
    elements: &[TreeElement],
    spec: &StorageSpec,
    store: &dyn BlobStore,
) -> Result<Vec<TreeElement>, LogError> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = elements
            .iter()
            .map(|element| scope.spawn(move || persist_element(element, spec, store)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("persist worker thread panicked"))
            .collect()
    })
}

/// Tree case of the walk: empty trees pass through unchanged; otherwise
/// siblings persist in parallel before the tree itself is written and
/// replaced with a reference.
fn persist_tree_value(tree: &Arc<TreeNode>, spec: &StorageSpec, store: &dyn BlobStore) -> Result<Node, LogError> {
    if tree.elements.is_empty() {
        return Ok(Node::Tree(Arc::clone(tree)));
    }

    let persisted_elements = persist_elements_parallel(&tree.elements, spec, store)?;
    let byte_count = TREE_OVERHEAD as u64
        + persisted_elements
            .iter()
            .map(|e| e.byte_count + TREE_ELEMENT_OVERHEAD as u64)
            .sum::<u64>();
    let new_tree = TreeNode {
        branching_factor: tree.branching_factor,
        elements: persisted_elements,
        length: tree.length,
        byte_count,
    };

    let bytes = wire::encode_tree(&new_tree);
    let uri = store.persist(&spec.tree_base_uri, &bytes, BlobKindHint::Tree)?;
    let reference = ReferenceNode {
        uri,
        ref_node_kind: RefNodeKind::Tree,
        length: new_tree.length,
        byte_count: codec::add_ref_overhead(new_tree.byte_count),
    };
    Ok(Node::Reference(Arc::new(reference)))
}

fn persist_tail_inner_nodes(
    nodes: &[Node],
    spec: &StorageSpec,
    store: &dyn BlobStore,
) -> Result<Vec<Node>, LogError> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = nodes
            .iter()
            .map(|node| scope.spawn(move || persist_node(node, spec, store, false)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("persist worker thread panicked"))
            .collect()
    })
}

/// Tail case: a log-root tail keeps its own shape inline (`log_root =
/// true`) even though its inner nodes still get persisted; any other
/// tail is written out and replaced with a reference.
fn persist_tail(
    tail: &Arc<TailNode>,
    spec: &StorageSpec,
    store: &dyn BlobStore,
    log_root: bool,
) -> Result<Node, LogError> {
    let persisted_nodes = persist_tail_inner_nodes(&tail.nodes, spec, store)?;
    let length = persisted_nodes.iter().map(|n| n.length()).sum::<u64>()
        + tail.buffers.iter().map(|b| b.length).sum::<u64>();
    let byte_count = crate::codec::TAIL_OVERHEAD as u64
        + persisted_nodes.iter().map(|n| n.byte_count()).sum::<u64>()
        + tail.buffers.iter().map(|b| b.byte_count()).sum::<u64>();
    let new_tail = TailNode {
        nodes: persisted_nodes,
        buffers: tail.buffers.clone(),
        inline_bytes: tail.inline_bytes,
        max_inline_bytes: tail.max_inline_bytes,
        length,
        byte_count,
    };

    if log_root {
        return Ok(Node::Tail(Arc::new(new_tail)));
    }

    let bytes = wire::encode_tail(&new_tail);
    let uri = store.persist(&spec.tail_base_uri, &bytes, BlobKindHint::Tail)?;
    let reference = ReferenceNode {
        uri,
        ref_node_kind: RefNodeKind::Tail,
        length: new_tail.length,
        byte_count: codec::add_ref_overhead(new_tail.byte_count),
    };
    Ok(Node::Reference(Arc::new(reference)))
}

fn persist_log(log: &Arc<LogNode>, spec: &StorageSpec, store: &dyn BlobStore) -> Result<Node, LogError> {
    let (root_result, tail_result) = std::thread::scope(|scope| {
        let root_handle = scope.spawn(|| persist_node(&log.root, spec, store, false));
        let tail_handle = scope.spawn(|| persist_node(&Node::Tail(Arc::clone(&log.tail)), spec, store, true));
        (
            root_handle.join().expect("persist worker thread panicked"),
            tail_handle.join().expect("persist worker thread panicked"),
        )
    });

    let new_root = root_result?;
    let new_tail = match tail_result? {
        Node::Tail(tail) => tail,
        other => {
            return Err(LogError::InvariantViolation(format!(
                "a log-root tail must persist inline, got {}",
                other.kind_name()
            )))
        }
    };

    let new_log = LogNode::recompute(new_root, new_tail, log.optimal_slab_bytes);
    Ok(Node::Log(Arc::new(new_log)))
}

fn persist_node(node: &Node, spec: &StorageSpec, store: &dyn BlobStore, log_root: bool) -> Result<Node, LogError> {
    match node {
        Node::Buffer(_) | Node::Reference(_) => Ok(node.clone()),
        Node::Slab(slab) => {
            let reference = persist_slab(slab, spec, store)?;
            Ok(Node::Reference(Arc::new(reference)))
        }
        Node::Tree(tree) => persist_tree_value(tree, spec, store),
        Node::Tail(tail) => persist_tail(tail, spec, store, log_root),
        Node::Log(log) => persist_log(log, spec, store),
    }
}

/// Replace in-memory subtrees of `node` with references to durably
/// stored copies.
pub fn persist_tree(node: &Node, spec: &StorageSpec, store: &dyn BlobStore) -> Result<Node, LogError> {
    persist_node(node, spec, store, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogOptions;
    use crate::enumerate::Message;
    use crate::fetch::fetch;
    use crate::log_::{append, empty_log};
    use crate::store::memory::MemoryStore;
    use crate::store::Uri;
    use crate::summary::summarise_log;

    fn memory_spec() -> StorageSpec {
        StorageSpec::single(Uri::new("mem://blobs"))
    }

    #[test]
    fn persisting_an_empty_log_keeps_the_root_an_empty_tree() {
        let log = empty_log(LogOptions::default()).unwrap();
        let store = MemoryStore::new();
        let persisted = persist_tree(&Node::Log(Arc::new(log)), &memory_spec(), &store).unwrap();
        match persisted {
            Node::Log(log) => match &log.root {
                Node::Tree(tree) => assert!(tree.elements.is_empty()),
                other => panic!("expected tree root, got {:?}", other),
            },
            other => panic!("expected a log, got {:?}", other),
        }
    }

    #[test]
    fn persistence_transparency_fetch_agrees_before_and_after() {
        let opts = LogOptions {
            branching_factor: 2,
            max_inline_bytes: 256,
            optimal_slab_bytes: 1024,
        };
        let mut log = empty_log(opts).unwrap();
        for i in 0..30u32 {
            log = append(log, format!("entry-{i:03}"), None).unwrap();
        }

        let before = fetch(&Node::Log(Arc::new(log.clone())), 0, None).unwrap();

        let store = MemoryStore::new();
        let persisted = persist_tree(&Node::Log(Arc::new(log)), &memory_spec(), &store).unwrap();
        let after = fetch(&persisted, 0, Some(&store)).unwrap();

        assert_eq!(before, after);
        assert_eq!(before.len(), 30);
        assert_eq!(after[5], Message::Text("entry-005".into()));
    }

    #[test]
    fn persisted_log_root_is_replaced_with_a_reference_but_tail_stays_inline() {
        let opts = LogOptions {
            branching_factor: 2,
            max_inline_bytes: 256,
            optimal_slab_bytes: 1024,
        };
        let mut log = empty_log(opts).unwrap();
        for i in 0..30u32 {
            log = append(log, format!("entry-{i:03}"), None).unwrap();
        }

        let store = MemoryStore::new();
        let persisted = persist_tree(&Node::Log(Arc::new(log)), &memory_spec(), &store).unwrap();
        let persisted_log = match persisted {
            Node::Log(log) => log,
            other => panic!("expected a log, got {:?}", other),
        };

        assert!(matches!(&persisted_log.root, Node::Reference(_)));
        let summary = summarise_log(&persisted_log);
        assert!(summary.root.reference_uri.is_some());
        assert_eq!(summary.tail.kind, "tail");
    }

    #[test]
    fn fetching_a_persisted_log_without_a_store_errors_on_reference_crossing() {
        let opts = LogOptions {
            branching_factor: 2,
            max_inline_bytes: 256,
            optimal_slab_bytes: 1024,
        };
        let mut log = empty_log(opts).unwrap();
        for i in 0..30u32 {
            log = append(log, format!("entry-{i:03}"), None).unwrap();
        }

        let store = MemoryStore::new();
        let persisted = persist_tree(&Node::Log(Arc::new(log)), &memory_spec(), &store).unwrap();
        let err = fetch(&persisted, 0, None).unwrap_err();
        assert!(matches!(err, LogError::Storage { .. }));
    }
}
