//! Inspection structure exposed by `summarise`: length,
//! byte_count, tree element counts, and reference URIs, without forcing
//! a full fetch.

use std::sync::Arc;

use crate::node::{LogNode, Node};

/// A shallow inspection of a single node: no recursion into tree
/// elements or references, just the aggregates already carried on the
/// node itself plus a one-level peek (element count, target URI).
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub kind: &'static str,
    pub length: u64,
    pub byte_count: u64,
    pub tree_element_count: Option<usize>,
    pub reference_uri: Option<String>,
}

pub fn summarise(node: &Node) -> Summary {
    let (tree_element_count, reference_uri) = match node {
        Node::Tree(tree) => (Some(tree.elements.len()), None),
        Node::Reference(reference) => (None, Some(reference.uri.as_str().to_string())),
        _ => (None, None),
    };
    Summary {
        kind: node.kind_name(),
        length: node.length(),
        byte_count: node.byte_count(),
        tree_element_count,
        reference_uri,
    }
}

/// Summary of a whole log: its own aggregates plus a summary of its
/// root and its live tail.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSummary {
    pub length: u64,
    pub byte_count: u64,
    pub root: Summary,
    pub tail: Summary,
}

pub fn summarise_log(log: &LogNode) -> LogSummary {
    LogSummary {
        length: log.length,
        byte_count: log.byte_count,
        root: summarise(&log.root),
        tail: summarise(&Node::Tail(Arc::clone(&log.tail))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogOptions;
    use crate::log_::{append, empty_log};

    #[test]
    fn empty_log_summarises_to_an_empty_tree_root() {
        let log = empty_log(LogOptions::default()).unwrap();
        let summary = summarise_log(&log);
        assert_eq!(summary.root.kind, "tree");
        assert_eq!(summary.root.tree_element_count, Some(0));
        assert_eq!(summary.tail.length, 0);
    }

    #[test]
    fn tail_length_reflects_pending_messages() {
        let log = empty_log(LogOptions::default()).unwrap();
        let log = append(log, "hello", None).unwrap();
        let log = append(log, "world", None).unwrap();
        let summary = summarise_log(&log);
        assert_eq!(summary.tail.length, 2);
        assert_eq!(summary.length, 2);
    }

    #[test]
    fn reference_nodes_expose_their_uri() {
        let reference = crate::node::ReferenceNode {
            uri: crate::store::Uri::new("mem://some/uri"),
            ref_node_kind: crate::node::RefNodeKind::Slab,
            length: 3,
            byte_count: 30,
        };
        let summary = summarise(&Node::Reference(Arc::new(reference)));
        assert_eq!(summary.reference_uri.as_deref(), Some("mem://some/uri"));
        assert_eq!(summary.length, 3);
    }
}
