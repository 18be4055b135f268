//! Detached copies of nodes for copy/paste.

use crate::domain::node::{fields, Payload};

/// A node (optionally with its subtree) copied out of a document.
///
/// Holds payloads only; pasting creates fresh ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    pub(crate) level: usize,
    pub(crate) root: ClipNode,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClipNode {
    pub(crate) payload: Payload,
    pub(crate) children: Vec<ClipNode>,
}

impl Clipboard {
    /// Level of the copied node in its source document.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn payload(&self) -> &Payload {
        &self.root.payload
    }

    pub fn has_children(&self) -> bool {
        !self.root.children.is_empty()
    }

    /// Number of nodes a paste creates.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(&node.children);
        }
        count
    }
}

impl ClipNode {
    pub(crate) fn leaf(payload: Payload) -> Self {
        Self {
            payload,
            children: Vec::new(),
        }
    }

    /// Append `-COPY-<seq>` to the part number of this node and every descendant.
    pub(crate) fn suffix_part_numbers(&mut self, seq: u64) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.mark_part_number(seq);
            stack.extend(node.children.iter_mut());
        }
    }

    pub(crate) fn mark_part_number(&mut self, seq: u64) {
        if let Some(number) = self.payload.get(fields::PART_NUMBER).map(|v| v.to_string()) {
            self.payload.insert(
                fields::PART_NUMBER.into(),
                format!("{}-COPY-{}", number, seq).into(),
            );
        }
    }

    pub(crate) fn mark_part_name(&mut self) {
        if let Some(name) = self.payload.get(fields::PART_NAME).map(|v| v.to_string()) {
            self.payload
                .insert(fields::PART_NAME.into(), format!("{} (copy)", name).into());
        }
    }
}
