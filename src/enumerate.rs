//! Buffer and message enumeration: flattening any node into its ordered
//! leaf stream.
//!
//! Eagerly materialized into a `Vec` rather than a lazy `Iterator`: the
//! walk may need to cross a [`crate::store::BlobStore`] boundary at any
//! reference, and a fallible, store-touching `Iterator` adapter chain
//! would need either a boxed trait object per level or awkward lifetime
//! plumbing for no real benefit at this crate's scale.

use std::sync::Arc;

use crate::cache;
use crate::error::LogError;
use crate::node::{BufferKind, BufferNode, ElementValue, Node, RefNodeKind, ReferenceNode};
use crate::store::BlobStore;
use crate::wire;

/// A decoded leaf value, tagged by how its buffer was written
/// (`BufferKind`). `EmbeddedNode` buffers decode back into a node and
/// recurse, so a single log entry that held a whole sub-log surfaces as
/// one `Nested` message wrapping that sub-log's own messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Bytes(Vec<u8>),
    Text(String),
    /// Raw encoded bytes for an application value; decode with the
    /// caller's own `ValueCodec<V>`.
    Encoded(Vec<u8>),
    Nested(Vec<Message>),
}

pub(crate) fn resolve_reference_to_node(
    reference: &ReferenceNode,
    store: Option<&dyn BlobStore>,
) -> Result<Node, LogError> {
    match reference.ref_node_kind {
        RefNodeKind::Slab => Ok(Node::Slab(cache::resolve_slab(reference, store)?)),
        RefNodeKind::Tail => Ok(Node::Tail(cache::resolve_tail(reference, store)?)),
        RefNodeKind::Tree => Ok(Node::Tree(cache::resolve_tree(reference, store)?)),
    }
}

fn buffers_of_element(
    value: &ElementValue,
    store: Option<&dyn BlobStore>,
) -> Result<Vec<Arc<BufferNode>>, LogError> {
    match value {
        ElementValue::Slab(slab) => Ok(slab.buffers.clone()),
        ElementValue::SlabRef(reference) => {
            Ok(cache::resolve_slab(reference, store)?.buffers.clone())
        }
        ElementValue::Tree(tree) => buffer_iterable(&Node::Tree(Arc::clone(tree)), store),
        ElementValue::TreeRef(reference) => {
            let tree = cache::resolve_tree(reference, store)?;
            buffer_iterable(&Node::Tree(tree), store)
        }
    }
}

/// Flatten `node` into its ordered stream of leaf buffers.
pub fn buffer_iterable(
    node: &Node,
    store: Option<&dyn BlobStore>,
) -> Result<Vec<Arc<BufferNode>>, LogError> {
    match node {
        Node::Buffer(buf) => Ok(vec![Arc::clone(buf)]),
        Node::Slab(slab) => Ok(slab.buffers.clone()),
        Node::Tail(tail) => {
            let mut out = Vec::new();
            for inner in &tail.nodes {
                out.extend(buffer_iterable(inner, store)?);
            }
            out.extend(tail.buffers.iter().cloned());
            Ok(out)
        }
        Node::Tree(tree) => {
            let mut out = Vec::new();
            for element in &tree.elements {
                out.extend(buffers_of_element(&element.value, store)?);
            }
            Ok(out)
        }
        Node::Reference(reference) => {
            let resolved = resolve_reference_to_node(reference, store)?;
            buffer_iterable(&resolved, store)
        }
        Node::Log(log) => {
            let mut out = buffer_iterable(&log.root, store)?;
            out.extend(buffer_iterable(&Node::Tail(Arc::clone(&log.tail)), store)?);
            Ok(out)
        }
    }
}

fn decode_buffer(buf: &BufferNode, store: Option<&dyn BlobStore>) -> Result<Message, LogError> {
    match buf.kind {
        BufferKind::RawBytes => Ok(Message::Bytes(buf.payload.clone())),
        BufferKind::Utf8String => String::from_utf8(buf.payload.clone())
            .map(Message::Text)
            .map_err(|e| LogError::decode("buffer(utf8_string)", e.to_string())),
        BufferKind::EncodedValue => Ok(Message::Encoded(buf.payload.clone())),
        BufferKind::EmbeddedNode => {
            let inner = wire::read_node(&buf.payload)?;
            Ok(Message::Nested(message_iterable(&inner, store)?))
        }
    }
}

/// Flatten `node` into its ordered stream of decoded messages.
pub fn message_iterable(
    node: &Node,
    store: Option<&dyn BlobStore>,
) -> Result<Vec<Message>, LogError> {
    buffer_iterable(node, store)?
        .iter()
        .map(|buf| decode_buffer(buf, store))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::buffer::{buffer, AppendInput};
    use crate::node::tail::{add_to_tail, empty_tail};

    #[test]
    fn buffer_flattens_to_itself() {
        let node = buffer(AppendInput::Bytes(vec![1]));
        let bufs = buffer_iterable(&node, None).unwrap();
        assert_eq!(bufs.len(), 1);
    }

    #[test]
    fn tail_flattens_nodes_before_own_buffers() {
        let tail = empty_tail(16);
        let tail = add_to_tail(&tail, AppendInput::Bytes(vec![0; 12]), None).unwrap();
        let tail = add_to_tail(&tail, AppendInput::Bytes(vec![0; 12]), None).unwrap();
        let tail = add_to_tail(&tail, AppendInput::Text("z".into()), None).unwrap();
        let msgs = message_iterable(&Node::Tail(Arc::new(tail)), None).unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[2], Message::Text("z".into()));
    }

    #[test]
    fn embedded_node_recurses_into_nested_messages() {
        let inner = buffer(AppendInput::Text("inner".into()));
        let outer = buffer(AppendInput::Node(inner));
        let msgs = message_iterable(&outer, None).unwrap();
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            Message::Nested(nested) => assert_eq!(nested, &vec![Message::Text("inner".into())]),
            other => panic!("expected nested message, got {:?}", other),
        }
    }

    #[test]
    fn reference_without_a_store_errors() {
        let reference = crate::node::ReferenceNode {
            uri: crate::store::Uri::new("mem://missing"),
            ref_node_kind: RefNodeKind::Slab,
            length: 1,
            byte_count: 10,
        };
        let node = Node::Reference(Arc::new(reference));
        let err = buffer_iterable(&node, None).unwrap_err();
        assert!(matches!(err, LogError::Storage { .. }));
    }
}
