//! Buffer: the atomic leaf payload.

use bincode::{Decode, Encode};

use crate::codec::BUFFER_OVERHEAD;

/// Decoding hint carried alongside a buffer's raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum BufferKind {
    RawBytes,
    Utf8String,
    EncodedValue,
    EmbeddedNode,
}

/// A single leaf byte payload plus its decoding kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferNode {
    pub payload: Vec<u8>,
    pub kind: BufferKind,
    /// 1 for raw/string/encoded buffers; the embedded node's own length
    /// when `kind == EmbeddedNode`.
    pub length: u64,
}

impl BufferNode {
    pub fn byte_count(&self) -> u64 {
        BUFFER_OVERHEAD as u64 + self.payload.len() as u64
    }
}

/// Input to [`buffer`] / [`crate::log_::Log::append`].
///
/// Raw byte arrays, strings, and nodes bypass the value codec; anything
/// else must be pre-encoded into `Encoded` by the caller
/// via a [`crate::codec::ValueCodec`].
#[derive(Debug, Clone)]
pub enum AppendInput {
    Bytes(Vec<u8>),
    Text(String),
    Node(crate::node::Node),
    Encoded(Vec<u8>),
}

impl From<Vec<u8>> for AppendInput {
    fn from(value: Vec<u8>) -> Self {
        AppendInput::Bytes(value)
    }
}

impl From<&[u8]> for AppendInput {
    fn from(value: &[u8]) -> Self {
        AppendInput::Bytes(value.to_vec())
    }
}

impl From<String> for AppendInput {
    fn from(value: String) -> Self {
        AppendInput::Text(value)
    }
}

impl From<&str> for AppendInput {
    fn from(value: &str) -> Self {
        AppendInput::Text(value.to_string())
    }
}

impl From<crate::node::Node> for AppendInput {
    fn from(value: crate::node::Node) -> Self {
        AppendInput::Node(value)
    }
}

/// Normalize an [`AppendInput`] into a `Buffer` node.
///
/// A `Node::Buffer` input is returned unchanged; any other node is
/// serialized whole and wrapped as an `embedded_node` buffer, so pushing
/// an entire sub-log into another log is just pushing one buffer entry.
pub fn buffer(input: AppendInput) -> crate::node::Node {
    use crate::node::Node;

    match input {
        AppendInput::Node(Node::Buffer(buf)) => Node::Buffer(buf),
        AppendInput::Bytes(payload) => Node::Buffer(std::sync::Arc::new(BufferNode {
            payload,
            kind: BufferKind::RawBytes,
            length: 1,
        })),
        AppendInput::Text(text) => Node::Buffer(std::sync::Arc::new(BufferNode {
            payload: text.into_bytes(),
            kind: BufferKind::Utf8String,
            length: 1,
        })),
        AppendInput::Encoded(payload) => Node::Buffer(std::sync::Arc::new(BufferNode {
            payload,
            kind: BufferKind::EncodedValue,
            length: 1,
        })),
        AppendInput::Node(node) => {
            let length = node.length();
            let payload = crate::wire::node_to_bytes(&node);
            Node::Buffer(std::sync::Arc::new(BufferNode {
                payload,
                kind: BufferKind::EmbeddedNode,
                length,
            }))
        }
    }
}
