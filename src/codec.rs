//! Node codec: serializes/deserializes persisted node shapes, and the
//! pluggable value codec used for application values that aren't raw
//! bytes, strings, or embedded nodes.
//!
//! Framing overhead constants are fixed small positive integers: each
//! equals the byte cost of that variant's discriminant plus its
//! fixed-width fields, independent of payload size.

use bincode::{Decode, Encode};

use crate::error::LogError;

pub const BUFFER_OVERHEAD: u32 = 5; // discriminant(1) + kind(1) + length-as-varint headroom(3)
pub const SLAB_OVERHEAD: u32 = 9; // discriminant(1) + buffer count(4) + length(4)
pub const TAIL_OVERHEAD: u32 = 13; // discriminant(1) + inline_bytes(4) + max_inline_bytes(4) + child count(4)
pub const TREE_OVERHEAD: u32 = 5; // discriminant(1) + branching_factor(4)
pub const TREE_ELEMENT_OVERHEAD: u32 = 28; // offset(8) + length(8) + byte_count(8) + nslabs(4)
pub const LOG_OVERHEAD: u32 = 9; // discriminant(1) + optimal_slab_bytes(8)
pub const REF_OVERHEAD: u32 = 14; // discriminant(1) + ref_node_kind(1) + length(8) + byte_count(8) - shares with cached fields, rounded

/// Wraps a persisted reference's `byte_count` to include framing: the
/// overhead of the reference node itself, not just the thing it points at.
pub fn add_ref_overhead(byte_count: u64) -> u64 {
    byte_count + REF_OVERHEAD as u64
}

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_big_endian()
}

/// Bound on decoded byte length to guard against crafted size headers.
/// 256 MiB is generous for any single persisted node blob in this design.
const DECODE_LIMIT: usize = 256 * 1024 * 1024;

pub(crate) fn encode<T: Encode>(value: &T) -> Vec<u8> {
    bincode::encode_to_vec(value, bincode_config())
        .expect("encoding an in-memory node value never fails")
}

pub(crate) fn decode<T: Decode<()>>(node_kind: &str, bytes: &[u8]) -> Result<T, LogError> {
    let config = bincode_config().with_limit::<DECODE_LIMIT>();
    let (value, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| LogError::decode(node_kind, e.to_string()))?;
    Ok(value)
}

/// Pluggable serializer for application values that are not raw bytes,
/// strings, or nodes. Byte arrays, strings, and nodes bypass this trait
/// entirely.
pub trait ValueCodec<V> {
    fn encode(&self, value: &V) -> Vec<u8>;
    fn decode(&self, bytes: &[u8]) -> Result<V, LogError>;
}

/// Default value codec backed by bincode.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeValueCodec;

impl<V: Encode + Decode<()>> ValueCodec<V> for BincodeValueCodec {
    fn encode(&self, value: &V) -> Vec<u8> {
        encode(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, LogError> {
        decode("encoded_value", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bincode_value_codec_roundtrips() {
        let codec = BincodeValueCodec;
        let value: (u32, String) = (7, "hi".to_string());
        let bytes = codec.encode(&value);
        let decoded: (u32, String) = codec.decode(&bytes).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn add_ref_overhead_adds_fixed_amount() {
        assert_eq!(add_ref_overhead(100), 100 + REF_OVERHEAD as u64);
    }
}
