//! Expansion and selection state consumed by the projector.
//!
//! Both are plain containers. Ids that no longer exist in the tree are
//! tolerated and simply have no effect on projection.

use std::collections::HashSet;

use crate::domain::node::NodeId;
use crate::domain::tree::BomTree;

/// Set of expanded node ids; absent means collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<NodeId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    /// Flip membership; returns the new state.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    pub fn expand(&mut self, id: NodeId) {
        self.expanded.insert(id);
    }

    pub fn collapse(&mut self, id: NodeId) {
        self.expanded.remove(&id);
    }

    /// Expand every node that has children.
    pub fn expand_all(&mut self, tree: &BomTree) {
        self.expanded = tree.parent_ids().into_iter().collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Expanded := nodes with children at `level` or above.
    pub fn expand_to_level(&mut self, tree: &BomTree, level: usize) {
        self.expanded = tree
            .iter()
            .filter(|n| n.level <= level && n.has_children())
            .map(|n| n.id)
            .collect();
    }

    /// Keep only expanded nodes strictly above `level`.
    pub fn collapse_from_level(&mut self, tree: &BomTree, level: usize) {
        self.expanded
            .retain(|&id| tree.get(id).is_some_and(|n| n.level < level));
    }

    pub(crate) fn forget(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.expanded.remove(id);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.expanded.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

impl FromIterator<NodeId> for ExpansionState {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self {
            expanded: iter.into_iter().collect(),
        }
    }
}

/// At most one selected node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<NodeId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: Option<NodeId>) {
        self.selected = id;
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub(crate) fn forget(&mut self, ids: &[NodeId]) {
        if self.selected.is_some_and(|s| ids.contains(&s)) {
            self.selected = None;
        }
    }
}
