//! Tail: the mutable frontier of the log.

use std::sync::Arc;

use crate::codec::TAIL_OVERHEAD;
use crate::error::LogError;
use crate::node::buffer::AppendInput;
use crate::node::{BufferNode, Node, SlabNode};
use crate::store::BlobStore;

/// The mutable frontier of the log; a bounded inline byte accumulator
/// that promotes overflow into sub-tails and slabs.
///
/// Logical order is `nodes` then `buffers`: a tail produced by "shifting"
/// always lists its displaced predecessor (and any earlier displaced
/// node) before the buffers accumulated since.
#[derive(Debug, Clone)]
pub struct TailNode {
    pub nodes: Vec<Node>,
    pub buffers: Vec<Arc<BufferNode>>,
    pub inline_bytes: u32,
    pub max_inline_bytes: u32,
    pub length: u64,
    pub byte_count: u64,
}

pub fn empty_tail(max_inline_bytes: u32) -> TailNode {
    TailNode {
        nodes: Vec::new(),
        buffers: Vec::new(),
        inline_bytes: TAIL_OVERHEAD,
        max_inline_bytes,
        length: 0,
        byte_count: TAIL_OVERHEAD as u64,
    }
}

impl TailNode {
    fn recompute(nodes: Vec<Node>, buffers: Vec<Arc<BufferNode>>, inline_bytes: u32, max_inline_bytes: u32) -> Self {
        let length = nodes.iter().map(|n| n.length()).sum::<u64>()
            + buffers.iter().map(|b| b.length).sum::<u64>();
        let byte_count = TAIL_OVERHEAD as u64
            + nodes.iter().map(|n| n.byte_count()).sum::<u64>()
            + buffers.iter().map(|b| b.byte_count()).sum::<u64>();
        TailNode {
            nodes,
            buffers,
            inline_bytes,
            max_inline_bytes,
            length,
            byte_count,
        }
    }
}

/// Accepts any value; non-node inputs are first wrapped via
/// [`crate::node::buffer::buffer`]. `store` is threaded through to
/// flatten a composite node (e.g. one embedding an already-persisted
/// `Reference`) that still fits inline.
pub fn add_to_tail(
    tail: &TailNode,
    input: AppendInput,
    store: Option<&dyn BlobStore>,
) -> Result<TailNode, LogError> {
    let node = match input {
        AppendInput::Node(n) => n,
        other => crate::node::buffer::buffer(other),
    };
    add_node(tail, node, store)
}

fn add_node(tail: &TailNode, node: Node, store: Option<&dyn BlobStore>) -> Result<TailNode, LogError> {
    if node.length() == 0 {
        return Ok(tail.clone());
    }

    if let Node::Buffer(buf) = &node {
        return add_entry_to_tail(tail, Arc::clone(buf));
    }

    if tail.inline_bytes as u64 + node.byte_count() <= tail.max_inline_bytes as u64 {
        let buffers = crate::enumerate::buffer_iterable(&node, store)?;
        let mut current = tail.clone();
        for buf in buffers {
            current = add_entry_to_tail(&current, buf)?;
        }
        Ok(current)
    } else {
        Ok(add_node_to_tail(tail, node))
    }
}

/// Wrap the existing tail as an inner node and install `node` as a
/// sibling child; `inline_bytes` resets to just the framing overhead.
fn add_node_to_tail(tail: &TailNode, node: Node) -> TailNode {
    let wrapped_old = Node::Tail(Arc::new(tail.clone()));
    TailNode::recompute(
        vec![wrapped_old, node],
        Vec::new(),
        TAIL_OVERHEAD,
        tail.max_inline_bytes,
    )
}

/// `add_entry_to_tail`.
pub fn add_entry_to_tail(tail: &TailNode, buf: Arc<BufferNode>) -> Result<TailNode, LogError> {
    // Case 1: too big to inline at all.
    if buf.payload.len() as u64 > tail.max_inline_bytes as u64 {
        let slab = SlabNode::from_buffers(vec![buf]);
        return Ok(add_node_to_tail(tail, Node::Slab(Arc::new(slab))));
    }

    // Case 2: would overflow the inline budget -- shift.
    if tail.inline_bytes as u64 + buf.payload.len() as u64 > tail.max_inline_bytes as u64 {
        let wrapped_old = Node::Tail(Arc::new(tail.clone()));
        let inline_bytes = TAIL_OVERHEAD + buf.byte_count() as u32;
        return Ok(TailNode::recompute(
            vec![wrapped_old],
            vec![buf],
            inline_bytes,
            tail.max_inline_bytes,
        ));
    }

    // Case 3: fits.
    let mut buffers = tail.buffers.clone();
    let inline_bytes = tail.inline_bytes + buf.byte_count() as u32;
    buffers.push(buf);
    Ok(TailNode::recompute(
        tail.nodes.clone(),
        buffers,
        inline_bytes,
        tail.max_inline_bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::buffer::AppendInput;

    #[test]
    fn empty_tail_has_zero_length() {
        let tail = empty_tail(4096);
        assert_eq!(tail.length, 0);
        assert_eq!(tail.inline_bytes, TAIL_OVERHEAD);
    }

    #[test]
    fn small_entries_accumulate_inline() {
        let tail = empty_tail(4096);
        let tail = add_to_tail(&tail, AppendInput::Text("hello".into()), None).unwrap();
        let tail = add_to_tail(&tail, AppendInput::Text("world".into()), None).unwrap();
        assert_eq!(tail.length, 2);
        assert_eq!(tail.buffers.len(), 2);
        assert!(tail.nodes.is_empty());
    }

    #[test]
    fn overflow_shifts_into_a_child_tail() {
        let tail = empty_tail(32);
        let tail = add_to_tail(&tail, AppendInput::Bytes(vec![0; 20]), None).unwrap();
        let tail = add_to_tail(&tail, AppendInput::Bytes(vec![0; 20]), None).unwrap();
        assert_eq!(tail.nodes.len(), 1);
        assert_eq!(tail.buffers.len(), 1);
        assert_eq!(tail.length, 2);
    }

    #[test]
    fn oversized_entry_becomes_a_singleton_slab_child() {
        let tail = empty_tail(32);
        let tail = add_to_tail(&tail, AppendInput::Bytes(vec![0; 64]), None).unwrap();
        assert_eq!(tail.nodes.len(), 1);
        match &tail.nodes[0] {
            Node::Slab(slab) => assert_eq!(slab.length, 1),
            other => panic!("expected slab child, got {:?}", other),
        }
    }

    #[test]
    fn tail_bound_respected_after_many_small_appends() {
        let mut tail = empty_tail(512);
        for i in 0..50u32 {
            tail = add_to_tail(&tail, AppendInput::Bytes(i.to_be_bytes().to_vec()), None).unwrap();
        }
        assert!(tail.inline_bytes <= tail.max_inline_bytes + 64);
    }
}
