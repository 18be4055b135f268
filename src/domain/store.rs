//! Node store: id-keyed table owning every node record.
//!
//! Relations between nodes are ids, never references. The store does not
//! validate anything; structural rules are enforced by the mutator.

use generational_arena::Arena;
use tracing::instrument;

use crate::domain::node::{BomNode, NodeId, Payload};

#[derive(Debug, Clone)]
pub struct NodeStore {
    arena: Arena<BomNode>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    /// Allocate a fresh id and store a childless node under it.
    #[instrument(level = "trace", skip(self, payload))]
    pub fn insert(&mut self, parent: Option<NodeId>, level: usize, payload: Payload) -> NodeId {
        let idx = self.arena.insert_with(|idx| BomNode {
            id: NodeId(idx),
            parent,
            children: Vec::new(),
            level,
            payload,
        });
        NodeId(idx)
    }

    /// Replace the record stored under `node.id`.
    ///
    /// A record whose id is not live (never issued, or already removed) is
    /// stored under a freshly allocated id instead; the id actually used is returned.
    #[instrument(level = "trace", skip(self, node), fields(id = %node.id))]
    pub fn upsert(&mut self, mut node: BomNode) -> NodeId {
        if let Some(slot) = self.arena.get_mut(node.id.0) {
            let id = node.id;
            *slot = node;
            return id;
        }
        let idx = self.arena.insert_with(|idx| {
            node.id = NodeId(idx);
            node
        });
        NodeId(idx)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get(&self, id: NodeId) -> Option<&BomNode> {
        self.arena.get(id.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut BomNode> {
        self.arena.get_mut(id.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, id: NodeId) -> Option<BomNode> {
        self.arena.remove(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// All stored nodes in slot order (not tree order).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &BomNode)> {
        self.arena.iter().map(|(idx, node)| (NodeId(idx), node))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.arena.iter().map(|(idx, _)| NodeId(idx))
    }
}
