//! Node codec: the persisted byte shape of every node variant.
//!
//! One wire struct per domain type, tagged by bincode's own enum
//! discriminant. Fields mirror the domain structs exactly so encoding is a
//! straight field copy and decoding trusts the persisted `length`/
//! `byte_count` rather than recomputing them, since they were already
//! computed once at construction time and persisted bytes are
//! content-addressed (any corruption changes the hash, not just the
//! fields).

use std::sync::Arc;

use bincode::{Decode, Encode};

use crate::codec;
use crate::error::LogError;
use crate::node::{
    BufferKind, BufferNode, ElementValue, LogNode, Node, RefNodeKind, ReferenceNode, SlabNode,
    TailNode, TreeElement, TreeNode,
};
use crate::store::{BlobStore, Uri};

#[derive(Debug, Clone, Encode, Decode)]
struct WireBuffer {
    payload: Vec<u8>,
    kind: BufferKind,
    length: u64,
}

#[derive(Debug, Clone, Encode, Decode)]
struct WireReference {
    uri: String,
    ref_node_kind: RefNodeKind,
    length: u64,
    byte_count: u64,
}

#[derive(Debug, Clone, Encode, Decode)]
struct WireSlab {
    buffers: Vec<WireBuffer>,
    length: u64,
    byte_count: u64,
}

#[derive(Debug, Clone, Encode, Decode)]
struct WireTail {
    nodes: Vec<WireNode>,
    buffers: Vec<WireBuffer>,
    inline_bytes: u32,
    max_inline_bytes: u32,
    length: u64,
    byte_count: u64,
}

#[derive(Debug, Clone, Encode, Decode)]
enum WireElementValue {
    Slab(WireSlab),
    SlabRef(WireReference),
    Tree(WireTree),
    TreeRef(WireReference),
}

#[derive(Debug, Clone, Encode, Decode)]
struct WireElement {
    offset: u64,
    length: u64,
    byte_count: u64,
    nslabs: u64,
    value: WireElementValue,
}

#[derive(Debug, Clone, Encode, Decode)]
struct WireTree {
    branching_factor: u32,
    elements: Vec<WireElement>,
    length: u64,
    byte_count: u64,
}

#[derive(Debug, Clone, Encode, Decode)]
struct WireLog {
    root: Box<WireNode>,
    tail: WireTail,
    optimal_slab_bytes: u64,
    length: u64,
    byte_count: u64,
}

#[derive(Debug, Clone, Encode, Decode)]
enum WireNode {
    Buffer(WireBuffer),
    Slab(WireSlab),
    Tail(WireTail),
    Tree(WireTree),
    Reference(WireReference),
    Log(WireLog),
}

fn to_wire_buffer(b: &BufferNode) -> WireBuffer {
    WireBuffer {
        payload: b.payload.clone(),
        kind: b.kind,
        length: b.length,
    }
}

fn from_wire_buffer(w: WireBuffer) -> BufferNode {
    BufferNode {
        payload: w.payload,
        kind: w.kind,
        length: w.length,
    }
}

fn to_wire_reference(r: &ReferenceNode) -> WireReference {
    WireReference {
        uri: r.uri.as_str().to_string(),
        ref_node_kind: r.ref_node_kind,
        length: r.length,
        byte_count: r.byte_count,
    }
}

fn from_wire_reference(w: WireReference) -> ReferenceNode {
    ReferenceNode {
        uri: Uri::new(w.uri),
        ref_node_kind: w.ref_node_kind,
        length: w.length,
        byte_count: w.byte_count,
    }
}

fn to_wire_slab(s: &SlabNode) -> WireSlab {
    WireSlab {
        buffers: s.buffers.iter().map(|b| to_wire_buffer(b)).collect(),
        length: s.length,
        byte_count: s.byte_count,
    }
}

fn from_wire_slab(w: WireSlab) -> SlabNode {
    SlabNode {
        buffers: w.buffers.into_iter().map(|b| Arc::new(from_wire_buffer(b))).collect(),
        length: w.length,
        byte_count: w.byte_count,
    }
}

fn to_wire_tail(t: &TailNode) -> WireTail {
    WireTail {
        nodes: t.nodes.iter().map(to_wire_node).collect(),
        buffers: t.buffers.iter().map(|b| to_wire_buffer(b)).collect(),
        inline_bytes: t.inline_bytes,
        max_inline_bytes: t.max_inline_bytes,
        length: t.length,
        byte_count: t.byte_count,
    }
}

fn from_wire_tail(w: WireTail) -> TailNode {
    TailNode {
        nodes: w.nodes.into_iter().map(from_wire_node).collect(),
        buffers: w.buffers.into_iter().map(|b| Arc::new(from_wire_buffer(b))).collect(),
        inline_bytes: w.inline_bytes,
        max_inline_bytes: w.max_inline_bytes,
        length: w.length,
        byte_count: w.byte_count,
    }
}

fn to_wire_element_value(v: &ElementValue) -> WireElementValue {
    match v {
        ElementValue::Slab(s) => WireElementValue::Slab(to_wire_slab(s)),
        ElementValue::SlabRef(r) => WireElementValue::SlabRef(to_wire_reference(r)),
        ElementValue::Tree(t) => WireElementValue::Tree(to_wire_tree(t)),
        ElementValue::TreeRef(r) => WireElementValue::TreeRef(to_wire_reference(r)),
    }
}

fn from_wire_element_value(w: WireElementValue) -> ElementValue {
    match w {
        WireElementValue::Slab(s) => ElementValue::Slab(Arc::new(from_wire_slab(s))),
        WireElementValue::SlabRef(r) => ElementValue::SlabRef(Arc::new(from_wire_reference(r))),
        WireElementValue::Tree(t) => ElementValue::Tree(Arc::new(from_wire_tree(t))),
        WireElementValue::TreeRef(r) => ElementValue::TreeRef(Arc::new(from_wire_reference(r))),
    }
}

fn to_wire_tree(t: &TreeNode) -> WireTree {
    WireTree {
        branching_factor: t.branching_factor,
        elements: t
            .elements
            .iter()
            .map(|e| WireElement {
                offset: e.offset,
                length: e.length,
                byte_count: e.byte_count,
                nslabs: e.nslabs,
                value: to_wire_element_value(&e.value),
            })
            .collect(),
        length: t.length,
        byte_count: t.byte_count,
    }
}

fn from_wire_tree(w: WireTree) -> TreeNode {
    TreeNode {
        branching_factor: w.branching_factor,
        elements: w
            .elements
            .into_iter()
            .map(|e| TreeElement {
                offset: e.offset,
                length: e.length,
                byte_count: e.byte_count,
                nslabs: e.nslabs,
                value: from_wire_element_value(e.value),
            })
            .collect(),
        length: w.length,
        byte_count: w.byte_count,
    }
}

fn to_wire_log(l: &LogNode) -> WireLog {
    WireLog {
        root: Box::new(to_wire_node(&l.root)),
        tail: to_wire_tail(&l.tail),
        optimal_slab_bytes: l.optimal_slab_bytes,
        length: l.length,
        byte_count: l.byte_count,
    }
}

fn from_wire_log(w: WireLog) -> LogNode {
    LogNode {
        root: from_wire_node(*w.root),
        tail: Arc::new(from_wire_tail(w.tail)),
        optimal_slab_bytes: w.optimal_slab_bytes,
        length: w.length,
        byte_count: w.byte_count,
    }
}

fn to_wire_node(node: &Node) -> WireNode {
    match node {
        Node::Buffer(b) => WireNode::Buffer(to_wire_buffer(b)),
        Node::Slab(s) => WireNode::Slab(to_wire_slab(s)),
        Node::Tail(t) => WireNode::Tail(to_wire_tail(t)),
        Node::Tree(t) => WireNode::Tree(to_wire_tree(t)),
        Node::Reference(r) => WireNode::Reference(to_wire_reference(r)),
        Node::Log(l) => WireNode::Log(to_wire_log(l)),
    }
}

fn from_wire_node(wire: WireNode) -> Node {
    match wire {
        WireNode::Buffer(b) => Node::Buffer(Arc::new(from_wire_buffer(b))),
        WireNode::Slab(s) => Node::Slab(Arc::new(from_wire_slab(s))),
        WireNode::Tail(t) => Node::Tail(Arc::new(from_wire_tail(t))),
        WireNode::Tree(t) => Node::Tree(Arc::new(from_wire_tree(t))),
        WireNode::Reference(r) => Node::Reference(Arc::new(from_wire_reference(r))),
        WireNode::Log(l) => Node::Log(Arc::new(from_wire_log(l))),
    }
}

/// Serialize an arbitrary node whole, used for the `embedded_node` buffer
/// case where a whole sub-log/sub-tree is pushed as a single
/// leaf payload.
pub fn node_to_bytes(node: &Node) -> Vec<u8> {
    codec::encode(&to_wire_node(node))
}

/// Inverse of [`node_to_bytes`].
pub fn read_node(bytes: &[u8]) -> Result<Node, LogError> {
    let wire: WireNode = codec::decode("node", bytes)?;
    Ok(from_wire_node(wire))
}

pub(crate) fn encode_slab(slab: &SlabNode) -> Vec<u8> {
    codec::encode(&to_wire_slab(slab))
}

pub(crate) fn decode_slab(bytes: &[u8]) -> Result<SlabNode, LogError> {
    let wire: WireSlab = codec::decode("slab", bytes)?;
    Ok(from_wire_slab(wire))
}

pub(crate) fn encode_tail(tail: &TailNode) -> Vec<u8> {
    codec::encode(&to_wire_tail(tail))
}

pub(crate) fn decode_tail(bytes: &[u8]) -> Result<TailNode, LogError> {
    let wire: WireTail = codec::decode("tail", bytes)?;
    Ok(from_wire_tail(wire))
}

pub(crate) fn encode_tree(tree: &TreeNode) -> Vec<u8> {
    codec::encode(&to_wire_tree(tree))
}

/// `store` is accepted for symmetry with `resolve_slab`/`resolve_tail` and
/// because a persisted tree's leaves are always references once
/// `persist_tree` has run; nothing here currently needs to dereference
/// them eagerly.
pub(crate) fn decode_tree(bytes: &[u8], _store: &dyn BlobStore) -> Result<TreeNode, LogError> {
    let wire: WireTree = codec::decode("tree", bytes)?;
    Ok(from_wire_tree(wire))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::buffer::{buffer, AppendInput};

    #[test]
    fn buffer_node_round_trips() {
        let node = buffer(AppendInput::Text("round trip".into()));
        let bytes = node_to_bytes(&node);
        let decoded = read_node(&bytes).unwrap();
        assert_eq!(node.byte_count(), decoded.byte_count());
        assert_eq!(node.length(), decoded.length());
    }

    #[test]
    fn slab_round_trips_through_dedicated_codec() {
        let node = buffer(AppendInput::Bytes(vec![1, 2, 3]));
        let slab = crate::node::slab::node_to_slab(&node).unwrap();
        let bytes = encode_slab(&slab);
        let decoded = decode_slab(&bytes).unwrap();
        assert_eq!(slab.length, decoded.length);
        assert_eq!(slab.byte_count, decoded.byte_count);
    }

    #[test]
    fn tail_round_trips_through_dedicated_codec() {
        let tail = crate::node::tail::empty_tail(4096);
        let tail = crate::node::tail::add_to_tail(&tail, AppendInput::Bytes(vec![9]), None).unwrap();
        let bytes = encode_tail(&tail);
        let decoded = decode_tail(&bytes).unwrap();
        assert_eq!(tail.length, decoded.length);
        assert_eq!(tail.buffers.len(), decoded.buffers.len());
    }
}
