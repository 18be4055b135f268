//! Hierarchy mutator: structural edits on a `BomDocument`.
//!
//! Every operation looks up and checks everything it needs before the first
//! write, so it either applies completely or returns an error with the
//! document unchanged.

use tracing::{debug, instrument};

use crate::domain::clipboard::{ClipNode, Clipboard};
use crate::domain::document::BomDocument;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{FieldValue, NodeId, Payload};

impl BomDocument {
    /// Append a new top-level node.
    #[instrument(level = "debug", skip(self, payload))]
    pub fn add_root(&mut self, payload: Payload) -> NodeId {
        let id = self.tree.insert_node(None, 0, payload);
        self.tree.attach(id, None, usize::MAX);
        debug!("add_root: {}", id);
        id
    }

    /// Append a new last child of `parent` and expand `parent`.
    #[instrument(level = "debug", skip(self, payload))]
    pub fn add_child(&mut self, parent: NodeId, payload: Payload) -> DomainResult<NodeId> {
        let level = self.tree.node(parent)?.level + 1;
        let id = self.tree.insert_node(Some(parent), level, payload);
        self.tree.attach(id, Some(parent), usize::MAX);
        self.expansion.expand(parent);
        debug!("add_child: {} under {}", id, parent);
        Ok(id)
    }

    /// Insert a new node directly after `target`, in the same sibling list.
    #[instrument(level = "debug", skip(self, payload))]
    pub fn add_sibling(&mut self, target: NodeId, payload: Payload) -> DomainResult<NodeId> {
        let node = self.tree.node(target)?;
        let (parent, level) = (node.parent, node.level);
        let pos = self.position_of(target, "add_sibling")?;
        let id = self.tree.insert_node(parent, level, payload);
        self.tree.attach(id, parent, pos + 1);
        debug!("add_sibling: {} after {}", id, target);
        Ok(id)
    }

    /// Remove `id` and all of its descendants. Returns the removed ids, pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_subtree(&mut self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        self.tree.node(id)?;
        let removed = self.tree.subtree_ids(id);
        self.tree.detach(id);
        let store = self.tree.store_mut();
        for &gone in &removed {
            store.remove(gone);
        }
        self.expansion.forget(&removed);
        self.selection.forget(&removed);
        debug!("delete_subtree: {} removed {} nodes", id, removed.len());
        Ok(removed)
    }

    /// Set one payload field. Returns the previous value.
    #[instrument(level = "debug", skip(self, value))]
    pub fn update_field(
        &mut self,
        id: NodeId,
        key: &str,
        value: FieldValue,
    ) -> DomainResult<Option<FieldValue>> {
        let node = self
            .tree
            .store_mut()
            .get_mut(id)
            .ok_or(DomainError::NotFound(id))?;
        Ok(node.payload.insert(key.to_string(), value))
    }

    /// Make `id` the last child of its preceding sibling.
    #[instrument(level = "debug", skip(self))]
    pub fn indent(&mut self, id: NodeId) -> DomainResult<()> {
        let parent = self.tree.node(id)?.parent;
        let pos = self.position_of(id, "indent")?;
        if pos == 0 {
            return Err(DomainError::invalid(
                "indent",
                format!("{} is the first sibling", id),
            ));
        }
        let new_parent = self.tree.siblings(parent)[pos - 1];
        let new_parent_level = self.tree.node(new_parent)?.level;

        self.tree.detach(id);
        self.tree.attach(id, Some(new_parent), usize::MAX);
        self.tree.recalculate_levels(id, Some(new_parent_level));
        self.expansion.expand(new_parent);
        debug!("indent: {} now under {}", id, new_parent);
        Ok(())
    }

    /// Move `id` up one level, directly after its old parent.
    #[instrument(level = "debug", skip(self))]
    pub fn outdent(&mut self, id: NodeId) -> DomainResult<()> {
        let parent = self.tree.node(id)?.parent.ok_or_else(|| {
            DomainError::invalid("outdent", format!("{} is already a root", id))
        })?;
        let grandparent = self.tree.node(parent)?.parent;
        let grandparent_level = match grandparent {
            Some(g) => Some(self.tree.node(g)?.level),
            None => None,
        };
        let parent_pos = self.position_of(parent, "outdent")?;

        self.tree.detach(id);
        self.tree.attach(id, grandparent, parent_pos + 1);
        self.tree.recalculate_levels(id, grandparent_level);
        debug!("outdent: {} now after {}", id, parent);
        Ok(())
    }

    /// Reorder `id` within its current sibling list: directly after `after`,
    /// or to the front when `after` is None.
    #[instrument(level = "debug", skip(self))]
    pub fn move_after(&mut self, id: NodeId, after: Option<NodeId>) -> DomainResult<()> {
        let parent = self.tree.node(id)?.parent;
        if let Some(anchor) = after {
            let anchor_parent = self.tree.node(anchor)?.parent;
            if anchor == id {
                return Ok(());
            }
            if anchor_parent != parent {
                return Err(DomainError::invalid(
                    "move_after",
                    format!("{} and {} have different parents", id, anchor),
                ));
            }
        }
        self.position_of(id, "move_after")?;

        self.tree.detach(id);
        let index = match after {
            Some(anchor) => self
                .tree
                .siblings(parent)
                .iter()
                .position(|&s| s == anchor)
                .map_or(usize::MAX, |p| p + 1),
            None => 0,
        };
        self.tree.attach(id, parent, index);
        debug!("move_after: {} index {}", id, index);
        Ok(())
    }

    /// Re-parent `id` under `new_parent` (None = root list) at `index`.
    ///
    /// `index` is clamped to the destination list after `id` has been
    /// detached from its old position.
    #[instrument(level = "debug", skip(self))]
    pub fn move_to_parent(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        index: usize,
    ) -> DomainResult<()> {
        self.tree.node(id)?;
        self.position_of(id, "move_to_parent")?;
        let parent_level = match new_parent {
            Some(p) => {
                let level = self.tree.node(p)?.level;
                if p == id || self.tree.is_descendant(id, p) {
                    return Err(DomainError::CircularReference { node: id, target: p });
                }
                Some(level)
            }
            None => None,
        };

        self.tree.detach(id);
        self.tree.attach(id, new_parent, index);
        self.tree.recalculate_levels(id, parent_level);
        if let Some(p) = new_parent {
            self.expansion.expand(p);
        }
        debug!("move_to_parent: {} under {:?} at {}", id, new_parent, index);
        Ok(())
    }

    /// Copy `id` (and optionally its whole subtree) directly after the original.
    #[instrument(level = "debug", skip(self))]
    pub fn duplicate(&mut self, id: NodeId, include_children: bool) -> DomainResult<NodeId> {
        let mut clip = self.copy(id, include_children)?;
        let parent = self.tree.node(id)?.parent;
        let pos = self.position_of(id, "duplicate")?;

        let seq = self.bump_seq();
        clip.root.mark_part_number(seq);
        clip.root.mark_part_name();

        let copy = self.insert_clip(parent, clip.level, &clip.root);
        self.tree.attach(copy, parent, pos + 1);
        debug!("duplicate: {} -> {}", id, copy);
        Ok(copy)
    }

    /// Take a detached copy of `id`, with its subtree if `include_children`.
    pub fn copy(&self, id: NodeId, include_children: bool) -> DomainResult<Clipboard> {
        let node = self.tree.node(id)?;
        let root = if include_children {
            self.clip_subtree(id)?
        } else {
            ClipNode::leaf(node.payload.clone())
        };
        Ok(Clipboard {
            level: node.level,
            root,
        })
    }

    /// Insert the clipboard contents directly after `target`, at `target`'s level.
    ///
    /// A copied subtree keeps its shape only at the level it was copied from,
    /// unless `force_level` is set. A single node pastes anywhere. Every
    /// pasted part number gets a `-COPY-<seq>` suffix.
    #[instrument(level = "debug", skip(self, clipboard))]
    pub fn paste(
        &mut self,
        target: NodeId,
        clipboard: &Clipboard,
        force_level: bool,
    ) -> DomainResult<NodeId> {
        let node = self.tree.node(target)?;
        let (parent, level) = (node.parent, node.level);
        if clipboard.has_children() && !force_level && clipboard.level != level {
            return Err(DomainError::invalid(
                "paste",
                format!(
                    "subtree copied at level {} cannot be pasted at level {}",
                    clipboard.level, level
                ),
            ));
        }
        let pos = self.position_of(target, "paste")?;

        let seq = self.bump_seq();
        let mut root = clipboard.root.clone();
        root.suffix_part_numbers(seq);

        let pasted = self.insert_clip(parent, level, &root);
        self.tree.attach(pasted, parent, pos + 1);
        debug!(
            "paste: {} nodes after {} as {}",
            clipboard.node_count(),
            target,
            pasted
        );
        Ok(pasted)
    }

    fn clip_subtree(&self, id: NodeId) -> DomainResult<ClipNode> {
        let node = self.tree.node(id)?;
        let children = node
            .children
            .iter()
            .map(|&c| self.clip_subtree(c))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(ClipNode {
            payload: node.payload.clone(),
            children,
        })
    }

    /// Create nodes for `clip` under `parent` with fresh ids. The top node is
    /// not linked into `parent`'s list; copies with children are expanded.
    fn insert_clip(&mut self, parent: Option<NodeId>, level: usize, clip: &ClipNode) -> NodeId {
        let top = self.tree.insert_node(parent, level, clip.payload.clone());
        let mut stack = vec![(top, level, clip)];
        while let Some((dst, dst_level, src)) = stack.pop() {
            for child in &src.children {
                let cloned = self
                    .tree
                    .insert_node(Some(dst), dst_level + 1, child.payload.clone());
                if let Some(d) = self.tree.store_mut().get_mut(dst) {
                    d.children.push(cloned);
                }
                stack.push((cloned, dst_level + 1, child));
            }
            if !src.children.is_empty() {
                self.expansion.expand(dst);
            }
        }
        top
    }

    /// Position of `id` in its sibling list.
    fn position_of(&self, id: NodeId, op: &'static str) -> DomainResult<usize> {
        let parent = self.tree.node(id)?.parent;
        self.tree
            .siblings(parent)
            .iter()
            .position(|&s| s == id)
            .ok_or_else(|| DomainError::invalid(op, format!("{} is not linked into the tree", id)))
    }
}
