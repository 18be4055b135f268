//! Forest of BOM nodes: node store plus the ordered list of root ids.

use std::collections::HashSet;

use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{BomNode, NodeId, Payload};
use crate::domain::store::NodeStore;

/// Arena-backed hierarchy of BOM lines.
///
/// Each node lives exactly once in the store and is referenced exactly once,
/// either from its parent's `children` or from `root_ids`.
#[derive(Debug, Clone, Default)]
pub struct BomTree {
    store: NodeStore,
    root_ids: Vec<NodeId>,
}

impl BomTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&BomNode> {
        self.store.get(id)
    }

    /// Like `get`, but an unknown id is a `NotFound` error.
    pub fn node(&self, id: NodeId) -> DomainResult<&BomNode> {
        self.store.get(id).ok_or(DomainError::NotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.store.contains(id)
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.root_ids
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Children of `id`; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.store
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// The sibling list a node with this parent lives in.
    pub fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(p) => self.children(p),
            None => &self.root_ids,
        }
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(p) = current {
            if chain.len() > self.len() {
                break;
            }
            chain.push(p);
            current = self.get(p).and_then(|n| n.parent);
        }
        chain
    }

    /// True if `candidate` is found below `ancestor`.
    ///
    /// Depth-first walk of `ancestor`'s children, bounded by the store size.
    #[instrument(level = "trace", skip(self))]
    pub fn is_descendant(&self, ancestor: NodeId, candidate: NodeId) -> bool {
        let mut stack: Vec<NodeId> = self.children(ancestor).to_vec();
        let mut budget = self.len();
        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            if budget == 0 {
                break;
            }
            budget -= 1;
            stack.extend_from_slice(self.children(current));
        }
        false
    }

    /// `id` followed by all of its descendants, pre-order.
    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                out.push(current);
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Whole forest, depth-first pre-order, roots in `root_ids` order.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Whole forest, children before their parent.
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Number of levels in the deepest branch; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        self.iter().map(|n| n.level + 1).max().unwrap_or(0)
    }

    pub fn max_level(&self) -> usize {
        self.iter().map(|n| n.level).max().unwrap_or(0)
    }

    pub fn leaf_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|n| n.children.is_empty())
            .map(|n| n.id)
            .collect()
    }

    /// Ids of every node that has at least one child.
    pub fn parent_ids(&self) -> Vec<NodeId> {
        self.store
            .iter()
            .filter(|(_, n)| n.has_children())
            .map(|(id, _)| id)
            .collect()
    }

    /// Report every broken structural invariant. Empty when consistent.
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut referenced: HashSet<NodeId> = HashSet::new();

        let mut seen_roots = HashSet::new();
        for &root in &self.root_ids {
            if !seen_roots.insert(root) {
                problems.push(format!("{} listed twice in root ids", root));
            }
            match self.get(root) {
                None => problems.push(format!("root id {} has no node", root)),
                Some(node) => {
                    if node.parent.is_some() {
                        problems.push(format!("root {} has a parent", root));
                    }
                    if node.level != 0 {
                        problems.push(format!("root {} has level {}", root, node.level));
                    }
                }
            }
            referenced.insert(root);
        }

        for (id, node) in self.store.iter() {
            if node.id != id {
                problems.push(format!("node stored under {} carries id {}", id, node.id));
            }
            let mut seen_children = HashSet::new();
            for &child in &node.children {
                if !seen_children.insert(child) {
                    problems.push(format!("{} lists child {} twice", id, child));
                }
                if !referenced.insert(child) {
                    problems.push(format!("{} is referenced more than once", child));
                }
                match self.get(child) {
                    None => problems.push(format!("{} lists missing child {}", id, child)),
                    Some(c) => {
                        if c.parent != Some(id) {
                            problems.push(format!("child {} does not point back to {}", child, id));
                        }
                        if c.level != node.level + 1 {
                            problems.push(format!(
                                "{} has level {}, parent {} has level {}",
                                child, c.level, id, node.level
                            ));
                        }
                    }
                }
            }
            match node.parent {
                None if !seen_roots.contains(&id) => {
                    problems.push(format!("{} has no parent and is not a root", id))
                }
                Some(p) if !self.children(p).contains(&id) => {
                    problems.push(format!("{} is missing from parent {} children", id, p))
                }
                _ => {}
            }
        }

        for id in self.store.ids() {
            if !referenced.contains(&id) {
                problems.push(format!("{} is orphaned", id));
            }
        }

        let reachable = self.iter().count();
        if problems.is_empty() && reachable != self.len() {
            problems.push(format!(
                "{} of {} nodes reachable from roots (cycle)",
                reachable,
                self.len()
            ));
        }

        problems
    }

    // ---- crate-internal structural primitives used by the mutator ----

    pub(crate) fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    pub(crate) fn insert_node(&mut self, parent: Option<NodeId>, level: usize, payload: Payload) -> NodeId {
        self.store.insert(parent, level, payload)
    }

    pub(crate) fn siblings_mut(&mut self, parent: Option<NodeId>) -> Option<&mut Vec<NodeId>> {
        match parent {
            Some(p) => self.store.get_mut(p).map(|n| &mut n.children),
            None => Some(&mut self.root_ids),
        }
    }

    /// Remove `id` from its parent's list (or root ids); returns its old position.
    pub(crate) fn detach(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.get(id)?.parent;
        let list = self.siblings_mut(parent)?;
        let pos = list.iter().position(|&c| c == id)?;
        list.remove(pos);
        Some(pos)
    }

    /// Insert `id` into `parent`'s list at `index` (clamped), and point it at `parent`.
    pub(crate) fn attach(&mut self, id: NodeId, parent: Option<NodeId>, index: usize) {
        if let Some(list) = self.siblings_mut(parent) {
            let at = index.min(list.len());
            list.insert(at, id);
        }
        if let Some(node) = self.store.get_mut(id) {
            node.parent = parent;
        }
    }

    /// Set `level = parent_level + 1` on `id` and every descendant
    /// (`parent_level = None` places `id` at level 0).
    pub(crate) fn recalculate_levels(&mut self, id: NodeId, parent_level: Option<usize>) {
        let mut stack = vec![(id, parent_level.map_or(0, |l| l + 1))];
        while let Some((current, level)) = stack.pop() {
            if let Some(node) = self.store.get_mut(current) {
                node.level = level;
                for &child in &node.children {
                    stack.push((child, level + 1));
                }
            }
        }
    }
}

/// Pre-order iterator over a `BomTree`.
pub struct TreeIterator<'a> {
    tree: &'a BomTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a BomTree) -> Self {
        let stack = tree.root_ids.iter().rev().copied().collect();
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = &'a BomNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some(node);
            }
        }
        None
    }
}

/// Post-order iterator over a `BomTree`.
pub struct PostOrderIterator<'a> {
    tree: &'a BomTree,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a BomTree) -> Self {
        let stack = tree.root_ids.iter().rev().map(|&id| (id, false)).collect();
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = &'a BomNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some(node);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::part_payload;

    // r1
    // ├── a
    // │   └── a1
    // └── b
    // r2
    fn sample() -> (BomTree, [NodeId; 5]) {
        let mut tree = BomTree::new();
        let r1 = tree.insert_node(None, 0, part_payload(1));
        tree.attach(r1, None, usize::MAX);
        let a = tree.insert_node(Some(r1), 1, part_payload(2));
        tree.attach(a, Some(r1), usize::MAX);
        let a1 = tree.insert_node(Some(a), 2, part_payload(3));
        tree.attach(a1, Some(a), usize::MAX);
        let b = tree.insert_node(Some(r1), 1, part_payload(4));
        tree.attach(b, Some(r1), usize::MAX);
        let r2 = tree.insert_node(None, 0, part_payload(5));
        tree.attach(r2, None, usize::MAX);
        (tree, [r1, a, a1, b, r2])
    }

    #[test]
    fn given_forest_when_iterating_then_preorder_across_roots() {
        let (tree, [r1, a, a1, b, r2]) = sample();
        let order: Vec<NodeId> = tree.iter().map(|n| n.id).collect();
        assert_eq!(order, vec![r1, a, a1, b, r2]);
    }

    #[test]
    fn given_forest_when_iterating_postorder_then_children_first() {
        let (tree, [r1, a, a1, b, r2]) = sample();
        let order: Vec<NodeId> = tree.iter_postorder().map(|n| n.id).collect();
        assert_eq!(order, vec![a1, a, b, r1, r2]);
    }

    #[test]
    fn given_forest_when_measuring_then_depth_and_leaves() {
        let (tree, [_, _, a1, b, r2]) = sample();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.max_level(), 2);
        assert_eq!(tree.leaf_nodes(), vec![a1, b, r2]);
        assert!(tree.validate().is_empty(), "{:?}", tree.validate());
    }

    #[test]
    fn given_grandchild_when_checking_descendant_then_true() {
        let (tree, [r1, a, a1, _, r2]) = sample();
        assert!(tree.is_descendant(r1, a1));
        assert!(tree.is_descendant(a, a1));
        assert!(!tree.is_descendant(a1, r1));
        assert!(!tree.is_descendant(r1, r2));
        assert!(!tree.is_descendant(r1, r1));
    }

    #[test]
    fn given_node_when_listing_ancestors_then_nearest_first() {
        let (tree, [r1, a, a1, _, _]) = sample();
        assert_eq!(tree.ancestors(a1), vec![a, r1]);
        assert!(tree.ancestors(r1).is_empty());
    }

    #[test]
    fn given_broken_back_reference_when_validating_then_reports() {
        let (mut tree, [_, a, a1, _, _]) = sample();
        tree.store_mut().get_mut(a1).unwrap().parent = None;
        let problems = tree.validate();
        assert!(!problems.is_empty());
        assert!(problems.iter().any(|p| p.contains(&a.to_string())));
    }
}
