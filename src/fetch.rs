//! Offset-based fetch: descend a tree's elements directly
//! rather than materializing and skipping its whole message stream.

use std::sync::Arc;

use crate::cache;
use crate::enumerate::{self, message_iterable, Message};
use crate::error::LogError;
use crate::node::{ElementValue, Node, TreeNode};
use crate::store::BlobStore;

fn fetch_element(
    value: &ElementValue,
    offset: u64,
    store: Option<&dyn BlobStore>,
) -> Result<Vec<Message>, LogError> {
    match value {
        ElementValue::Slab(slab) => fetch(&Node::Slab(Arc::clone(slab)), offset, store),
        ElementValue::SlabRef(reference) => {
            let slab = cache::resolve_slab(reference, store)?;
            fetch(&Node::Slab(slab), offset, store)
        }
        ElementValue::Tree(tree) => fetch_tree(tree, offset, store),
        ElementValue::TreeRef(reference) => {
            let tree = cache::resolve_tree(reference, store)?;
            fetch_tree(&tree, offset, store)
        }
    }
}

fn full_messages_of_element(
    value: &ElementValue,
    store: Option<&dyn BlobStore>,
) -> Result<Vec<Message>, LogError> {
    match value {
        ElementValue::Slab(slab) => message_iterable(&Node::Slab(Arc::clone(slab)), store),
        ElementValue::SlabRef(reference) => {
            let slab = cache::resolve_slab(reference, store)?;
            message_iterable(&Node::Slab(slab), store)
        }
        ElementValue::Tree(tree) => message_iterable(&Node::Tree(Arc::clone(tree)), store),
        ElementValue::TreeRef(reference) => {
            let tree = cache::resolve_tree(reference, store)?;
            message_iterable(&Node::Tree(tree), store)
        }
    }
}

/// Single left-to-right linear scan to find the element containing
/// `offset`, recurse into it, then concatenate the remaining elements'
/// full streams.
fn fetch_tree(tree: &TreeNode, offset: u64, store: Option<&dyn BlobStore>) -> Result<Vec<Message>, LogError> {
    if tree.elements.is_empty() {
        return Ok(Vec::new());
    }

    let mut idx = 0usize;
    for (i, element) in tree.elements.iter().enumerate() {
        if element.offset <= offset {
            idx = i;
        } else {
            break;
        }
    }

    let element = &tree.elements[idx];
    let mut out = fetch_element(&element.value, offset - element.offset, store)?;
    for element in &tree.elements[idx + 1..] {
        out.extend(full_messages_of_element(&element.value, store)?);
    }
    Ok(out)
}

/// Returns the messages at positions `[offset, length)`.
pub fn fetch(node: &Node, offset: u64, store: Option<&dyn BlobStore>) -> Result<Vec<Message>, LogError> {
    match node {
        Node::Reference(reference) => {
            let resolved = enumerate::resolve_reference_to_node(reference, store)?;
            fetch(&resolved, offset, store)
        }
        Node::Tree(tree) => fetch_tree(tree, offset, store),
        other => {
            let messages = message_iterable(other, store)?;
            Ok(messages.into_iter().skip(offset as usize).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogOptions;
    use crate::log_::{append, empty_log};

    #[test]
    fn fetch_zero_returns_everything_in_order() {
        let log = empty_log(LogOptions::default()).unwrap();
        let log = append(log, "hello", None).unwrap();
        let log = append(log, "world", None).unwrap();
        let msgs = fetch(&Node::Log(Arc::new(log)), 0, None).unwrap();
        assert_eq!(
            msgs,
            vec![
                Message::Text("hello".into()),
                Message::Text("world".into())
            ]
        );
    }

    #[test]
    fn fetch_from_offset_returns_a_suffix() {
        let log = empty_log(LogOptions::default()).unwrap();
        let log = append(log, "hello", None).unwrap();
        let log = append(log, "world", None).unwrap();
        let msgs = fetch(&Node::Log(Arc::new(log)), 1, None).unwrap();
        assert_eq!(msgs, vec![Message::Text("world".into())]);
    }

    #[test]
    fn fetch_past_the_end_is_empty() {
        let log = empty_log(LogOptions::default()).unwrap();
        let log = append(log, "only", None).unwrap();
        let msgs = fetch(&Node::Log(Arc::new(log)), 5, None).unwrap();
        assert!(msgs.is_empty());
    }
}
