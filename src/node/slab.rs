//! Slab: a sealed, ordered group of buffers.

use std::sync::Arc;

use crate::codec::SLAB_OVERHEAD;
use crate::node::{BufferNode, Node};

/// A sealed, ordered group of buffers. Never grows after creation.
#[derive(Debug, Clone)]
pub struct SlabNode {
    pub buffers: Vec<Arc<BufferNode>>,
    pub length: u64,
    pub byte_count: u64,
}

impl SlabNode {
    pub(crate) fn from_buffers(buffers: Vec<Arc<BufferNode>>) -> Self {
        let length = buffers.iter().map(|b| b.length).sum();
        let byte_count =
            SLAB_OVERHEAD as u64 + buffers.iter().map(|b| b.byte_count()).sum::<u64>();
        SlabNode {
            buffers,
            length,
            byte_count,
        }
    }
}

/// Flatten any node into a slab by collecting its buffer stream. Used
/// when the tail is sealed, and whenever a buffer larger than
/// `max_inline_bytes` must be wrapped directly into a singleton slab.
pub fn node_to_slab(node: &Node) -> Result<SlabNode, crate::error::LogError> {
    let buffers = crate::enumerate::buffer_iterable(node, None)?;
    Ok(SlabNode::from_buffers(buffers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::buffer::{buffer, AppendInput};

    #[test]
    fn empty_node_yields_empty_slab() {
        let tail = crate::node::tail::empty_tail(4096);
        let slab = node_to_slab(&Node::Tail(Arc::new(tail))).unwrap();
        assert_eq!(slab.length, 0);
        assert_eq!(slab.byte_count, SLAB_OVERHEAD as u64);
    }

    #[test]
    fn slab_aggregates_sum_buffers() {
        let a = buffer(AppendInput::Bytes(vec![1, 2, 3]));
        let slab = node_to_slab(&a).unwrap();
        assert_eq!(slab.length, 1);
        match a {
            Node::Buffer(b) => assert_eq!(slab.byte_count, SLAB_OVERHEAD as u64 + b.byte_count()),
            _ => unreachable!(),
        }
    }
}
