//! `bulklog`: an append-only, durable, content-addressed message log.
//!
//! The core is a layered, immutable node tree (log → tree → slab →
//! buffer, plus a mutable tail and external references) built
//! incrementally by [`append`] and made durable by [`persist`].
//! Messages are read back in order, from any logical offset, via
//! [`fetch`].

pub mod cache;
pub mod codec;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod fetch;
pub mod log_;
pub mod node;
pub mod persist;
pub mod store;
pub mod summary;
pub mod wire;

pub use cache::{cache_sizes, clear_all};
pub use codec::{BincodeValueCodec, ValueCodec};
pub use config::LogOptions;
pub use enumerate::{buffer_iterable, message_iterable, Message};
pub use error::LogError;
pub use fetch::fetch;
pub use log_::{append, empty_log};
pub use node::{
    AppendInput, BufferKind, BufferNode, ElementValue, LogNode, Node, RefNodeKind, ReferenceNode,
    SlabNode, TailNode, TreeElement, TreeNode,
};
pub use persist::persist_tree;
pub use store::{BlobKindHint, BlobStore, StorageSpec, Uri};
pub use summary::{summarise, summarise_log, LogSummary, Summary};
pub use wire::{node_to_bytes, read_node};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn end_to_end_append_persist_fetch() {
        let log = empty_log(LogOptions::default()).unwrap();
        let log = append(log, "hello", None).unwrap();
        let log = append(log, "world", None).unwrap();

        let store = MemoryStore::new();
        let spec = StorageSpec::single(Uri::new("mem://blobs"));
        let persisted = persist_tree(&Node::Log(std::sync::Arc::new(log)), &spec, &store).unwrap();

        let messages = fetch(&persisted, 0, Some(&store)).unwrap();
        assert_eq!(
            messages,
            vec![Message::Text("hello".into()), Message::Text("world".into())]
        );
    }
}
