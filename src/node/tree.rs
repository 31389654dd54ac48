//! Tree: a persistent, right-growing B+-like tree over slabs.

use std::sync::Arc;

use crate::cache;
use crate::codec::{TREE_ELEMENT_OVERHEAD, TREE_OVERHEAD};
use crate::error::LogError;
use crate::node::{ReferenceNode, SlabNode};
use crate::store::BlobStore;

/// What a [`TreeElement`] wraps: a slab, a reference to a slab or tree,
/// or a subtree — the only four shapes this algorithm ever
/// produces.
#[derive(Debug, Clone)]
pub enum ElementValue {
    Slab(Arc<SlabNode>),
    SlabRef(Arc<ReferenceNode>),
    Tree(Arc<TreeNode>),
    TreeRef(Arc<ReferenceNode>),
}

impl ElementValue {
    pub fn length(&self) -> u64 {
        match self {
            ElementValue::Slab(s) => s.length,
            ElementValue::SlabRef(r) => r.length,
            ElementValue::Tree(t) => t.length,
            ElementValue::TreeRef(r) => r.length,
        }
    }

    pub fn byte_count(&self) -> u64 {
        match self {
            ElementValue::Slab(s) => s.byte_count,
            ElementValue::SlabRef(r) => r.byte_count,
            ElementValue::Tree(t) => t.byte_count,
            ElementValue::TreeRef(r) => r.byte_count,
        }
    }
}

/// `{offset, length, byte_count, nslabs, value}`.
#[derive(Debug, Clone)]
pub struct TreeElement {
    pub offset: u64,
    pub length: u64,
    pub byte_count: u64,
    pub nslabs: u64,
    pub value: ElementValue,
}

impl TreeElement {
    fn leaf(offset: u64, value: ElementValue) -> Self {
        TreeElement {
            offset,
            length: value.length(),
            byte_count: value.byte_count(),
            nslabs: 1,
            value,
        }
    }
}

/// A right-growing, order-preserving, height-balanced structure whose
/// leaves are slabs or slab-references.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub branching_factor: u32,
    pub elements: Vec<TreeElement>,
    pub length: u64,
    pub byte_count: u64,
}

pub fn empty_tree(branching_factor: u32) -> TreeNode {
    TreeNode {
        branching_factor,
        elements: Vec::new(),
        length: 0,
        byte_count: TREE_OVERHEAD as u64,
    }
}

impl TreeNode {
    fn from_elements(branching_factor: u32, elements: Vec<TreeElement>) -> Self {
        let length = elements.iter().map(|e| e.length).sum();
        let byte_count = TREE_OVERHEAD as u64
            + elements
                .iter()
                .map(|e| e.byte_count + TREE_ELEMENT_OVERHEAD as u64)
                .sum::<u64>();
        TreeNode {
            branching_factor,
            elements,
            length,
            byte_count,
        }
    }

    fn is_balanced(&self) -> bool {
        match self.elements.first() {
            None => true,
            Some(first) => self.elements.iter().all(|e| e.nslabs == first.nslabs),
        }
    }
}

/// The central balancing algorithm. `slab.length` must be > 0.
pub fn push_slab(
    tree: &TreeNode,
    slab: Arc<SlabNode>,
    store: Option<&dyn BlobStore>,
) -> Result<TreeNode, LogError> {
    if slab.length == 0 {
        return Err(LogError::InvariantViolation(
            "push_slab requires a non-empty slab".into(),
        ));
    }

    if tree.is_balanced() {
        if tree.elements.len() < tree.branching_factor as usize {
            let mut elements = tree.elements.clone();
            elements.push(TreeElement::leaf(tree.length, ElementValue::Slab(slab)));
            return Ok(TreeNode::from_elements(tree.branching_factor, elements));
        }

        // Completely full at this level: reparent, increasing height by one.
        let total_nslabs: u64 = tree.elements.iter().map(|e| e.nslabs).sum();
        let child = TreeElement {
            offset: 0,
            length: tree.length,
            byte_count: tree.byte_count,
            nslabs: total_nslabs,
            value: ElementValue::Tree(Arc::new(tree.clone())),
        };
        let reparented = TreeNode::from_elements(tree.branching_factor, vec![child]);
        return push_slab(&reparented, slab, store);
    }

    // Unbalanced: descend into the last (in-progress) element.
    descend_last(tree, slab, store)
}

fn descend_last(
    tree: &TreeNode,
    slab: Arc<SlabNode>,
    store: Option<&dyn BlobStore>,
) -> Result<TreeNode, LogError> {
    let mut elements = tree.elements.clone();
    let last_idx = elements.len() - 1;
    let last = elements[last_idx].clone();

    let new_element = match &last.value {
        ElementValue::TreeRef(reference) => {
            let materialized = cache::resolve_tree(reference, store)?;
            let updated = push_slab(&materialized, slab, store)?;
            TreeElement {
                offset: last.offset,
                length: updated.length,
                byte_count: updated.byte_count,
                nslabs: last.nslabs + 1,
                value: ElementValue::Tree(Arc::new(updated)),
            }
        }
        ElementValue::Tree(subtree) => {
            let updated = push_slab(subtree, slab, store)?;
            TreeElement {
                offset: last.offset,
                length: updated.length,
                byte_count: updated.byte_count,
                nslabs: last.nslabs + 1,
                value: ElementValue::Tree(Arc::new(updated)),
            }
        }
        ElementValue::Slab(existing) => {
            upgrade_leaf(tree.branching_factor, last.offset, ElementValue::Slab(Arc::clone(existing)), slab)?
        }
        ElementValue::SlabRef(existing) => {
            upgrade_leaf(
                tree.branching_factor,
                last.offset,
                ElementValue::SlabRef(Arc::clone(existing)),
                slab,
            )?
        }
    };

    elements[last_idx] = new_element;
    Ok(TreeNode::from_elements(tree.branching_factor, elements))
}

/// Upgrade a leaf element into a two-leaf subtree by seeding a fresh
/// inner tree with the existing leaf, then pushing the incoming slab.
fn upgrade_leaf(
    branching_factor: u32,
    offset: u64,
    existing: ElementValue,
    incoming: Arc<SlabNode>,
) -> Result<TreeElement, LogError> {
    let seeded = TreeNode::from_elements(branching_factor, vec![TreeElement::leaf(0, existing)]);
    let inner = push_slab(&seeded, incoming, None)?;
    Ok(TreeElement {
        offset,
        length: inner.length,
        byte_count: inner.byte_count,
        nslabs: 2,
        value: ElementValue::Tree(Arc::new(inner)),
    })
}
