//! Edit session: one document behind one lock.
//!
//! Every command takes the write lock exactly once, so readers never see
//! a half-applied structural change.

use std::sync::{Arc, RwLock};

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{BomDocument, Clipboard, DomainResult, FieldValue, NodeId, Payload};

/// A single user action against a document.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// `None` payload uses the default new-assembly payload
    AddRoot { payload: Option<Payload> },
    AddChild { parent: NodeId, payload: Option<Payload> },
    AddSibling { target: NodeId, payload: Option<Payload> },
    Delete(NodeId),
    SetField { id: NodeId, key: String, value: FieldValue },
    Indent(NodeId),
    Outdent(NodeId),
    MoveAfter { id: NodeId, after: Option<NodeId> },
    MoveTo { id: NodeId, parent: Option<NodeId>, index: usize },
    Duplicate { id: NodeId, include_children: bool },
    Paste { target: NodeId, clipboard: Clipboard, force_level: bool },
    ToggleExpanded(NodeId),
    ExpandAll,
    CollapseAll,
    ExpandToLevel(usize),
    CollapseFromLevel(usize),
    Select(Option<NodeId>),
    AddColumn { key: String, label: String },
    RemoveColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Created(NodeId),
    Removed(Vec<NodeId>),
    Updated,
    Unchanged,
}

impl EditCommand {
    /// Apply to `doc` directly, without any locking.
    pub fn apply(self, doc: &mut BomDocument) -> DomainResult<EditOutcome> {
        use EditOutcome::*;

        let outcome = match self {
            EditCommand::AddRoot { payload } => {
                let payload = payload.unwrap_or_else(|| doc.new_assembly_payload());
                Created(doc.add_root(payload))
            }
            EditCommand::AddChild { parent, payload } => {
                doc.tree().node(parent)?;
                let payload = payload.unwrap_or_else(|| doc.new_part_payload());
                Created(doc.add_child(parent, payload)?)
            }
            EditCommand::AddSibling { target, payload } => {
                doc.tree().node(target)?;
                let payload = payload.unwrap_or_else(|| doc.new_part_payload());
                Created(doc.add_sibling(target, payload)?)
            }
            EditCommand::Delete(id) => Removed(doc.delete_subtree(id)?),
            EditCommand::SetField { id, key, value } => {
                let unchanged = doc.tree().node(id)?.field(&key) == Some(&value);
                if unchanged {
                    Unchanged
                } else {
                    doc.update_field(id, &key, value)?;
                    Updated
                }
            }
            EditCommand::Indent(id) => {
                doc.indent(id)?;
                Updated
            }
            EditCommand::Outdent(id) => {
                doc.outdent(id)?;
                Updated
            }
            EditCommand::MoveAfter { id, after } if after == Some(id) => {
                doc.tree().node(id)?;
                Unchanged
            }
            EditCommand::MoveAfter { id, after } => {
                doc.move_after(id, after)?;
                Updated
            }
            EditCommand::MoveTo { id, parent, index } => {
                doc.move_to_parent(id, parent, index)?;
                Updated
            }
            EditCommand::Duplicate {
                id,
                include_children,
            } => Created(doc.duplicate(id, include_children)?),
            EditCommand::Paste {
                target,
                clipboard,
                force_level,
            } => Created(doc.paste(target, &clipboard, force_level)?),
            EditCommand::ToggleExpanded(id) => {
                doc.toggle_expanded(id);
                Updated
            }
            EditCommand::ExpandAll => {
                doc.expand_all();
                Updated
            }
            EditCommand::CollapseAll => {
                doc.collapse_all();
                Updated
            }
            EditCommand::ExpandToLevel(level) => {
                doc.expand_to_level(level);
                Updated
            }
            EditCommand::CollapseFromLevel(level) => {
                doc.collapse_from_level(level);
                Updated
            }
            EditCommand::Select(id) => {
                doc.set_selected(id);
                Updated
            }
            EditCommand::AddColumn { key, label } => {
                doc.columns.add_column(&key, &label)?;
                Updated
            }
            EditCommand::RemoveColumn(key) => match doc.columns.remove_column(&key) {
                Some(_) => Updated,
                None => Unchanged,
            },
        };
        Ok(outcome)
    }
}

/// Shared handle to a document. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    doc: Arc<RwLock<BomDocument>>,
}

impl EditSession {
    pub fn new(doc: BomDocument) -> Self {
        Self {
            doc: Arc::new(RwLock::new(doc)),
        }
    }

    /// Run one command under the write lock.
    #[instrument(level = "debug", skip(self))]
    pub fn apply(&self, command: EditCommand) -> ApplicationResult<EditOutcome> {
        let mut doc = self.doc.write().map_err(|_| ApplicationError::LockPoisoned)?;
        let outcome = command.apply(&mut doc)?;
        debug!("outcome: {:?}", outcome);
        Ok(outcome)
    }

    /// Read under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&BomDocument) -> R) -> ApplicationResult<R> {
        let doc = self.doc.read().map_err(|_| ApplicationError::LockPoisoned)?;
        Ok(f(&doc))
    }

    /// Copy a node (or subtree) for a later `EditCommand::Paste`.
    pub fn copy(&self, id: NodeId, include_children: bool) -> ApplicationResult<Clipboard> {
        Ok(self.read(|doc| doc.copy(id, include_children))??)
    }

    /// Owned copy for lock-free readers.
    pub fn snapshot(&self) -> ApplicationResult<BomDocument> {
        self.read(|doc| doc.clone())
    }

    /// Ids of the currently visible rows.
    pub fn visible_ids(&self) -> ApplicationResult<Vec<NodeId>> {
        self.read(|doc| doc.visible().ids())
    }
}
