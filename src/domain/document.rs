//! A BOM document: the tree plus the view state that travels with it.

use crate::domain::columns::ColumnSchema;
use crate::domain::node::{assembly_payload, fields, part_payload, BomNode, NodeId, Payload};
use crate::domain::projector::{project, Projection};
use crate::domain::tree::BomTree;
use crate::domain::view::{ExpansionState, SelectionState};

/// Everything one editor session works on.
///
/// Structural operations live in `mutator`; they keep tree, expansion and
/// selection consistent with each other.
#[derive(Debug, Clone)]
pub struct BomDocument {
    pub(crate) tree: BomTree,
    pub(crate) expansion: ExpansionState,
    pub(crate) selection: SelectionState,
    pub columns: ColumnSchema,
    next_seq: u64,
}

/// Sequence number embedded in a generated part number
/// (`NEW-0007`, `C1-COPY-7`).
fn generated_seq(number: &str) -> Option<u64> {
    number
        .strip_prefix("NEW-")
        .or_else(|| number.rsplit_once("-COPY-").map(|(_, tail)| tail))
        .and_then(|digits| digits.parse().ok())
}

impl Default for BomDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl BomDocument {
    pub fn new() -> Self {
        Self::with_columns(ColumnSchema::bom_default())
    }

    pub fn with_columns(columns: ColumnSchema) -> Self {
        Self {
            tree: BomTree::new(),
            expansion: ExpansionState::new(),
            selection: SelectionState::new(),
            columns,
            next_seq: 1,
        }
    }

    pub(crate) fn from_parts(tree: BomTree, columns: ColumnSchema) -> Self {
        let mut doc = Self::with_columns(columns);
        doc.next_seq = tree
            .iter()
            .filter_map(|n| n.field(fields::PART_NUMBER))
            .filter_map(|v| generated_seq(&v.to_string()))
            .max()
            .map_or(1, |max| max + 1);
        doc.tree = tree;
        doc
    }

    pub fn tree(&self) -> &BomTree {
        &self.tree
    }

    pub fn get(&self, id: NodeId) -> Option<&BomNode> {
        self.tree.get(id)
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn expansion_mut(&mut self) -> &mut ExpansionState {
        &mut self.expansion
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    pub fn toggle_expanded(&mut self, id: NodeId) -> bool {
        self.expansion.toggle(id)
    }

    pub fn expand_all(&mut self) {
        self.expansion.expand_all(&self.tree);
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
    }

    pub fn expand_to_level(&mut self, level: usize) {
        self.expansion.expand_to_level(&self.tree, level);
    }

    pub fn collapse_from_level(&mut self, level: usize) {
        self.expansion.collapse_from_level(&self.tree, level);
    }

    pub fn set_selected(&mut self, id: Option<NodeId>) {
        self.selection.set(id);
    }

    /// Visible rows under the current expansion state.
    pub fn visible(&self) -> Projection<'_> {
        project(&self.tree, &self.expansion)
    }

    /// Default payload for a new top-level assembly.
    pub fn new_assembly_payload(&mut self) -> Payload {
        assembly_payload(self.bump_seq())
    }

    /// Default payload for a new part below or beside an existing line.
    pub fn new_part_payload(&mut self) -> Payload {
        part_payload(self.bump_seq())
    }

    pub(crate) fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
