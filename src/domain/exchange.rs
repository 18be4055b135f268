//! Flat rows with explicit level and path, and the rebuild from them.

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{BomNode, NodeId, Payload};
use crate::domain::tree::BomTree;

/// One exported line.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub level: usize,
    /// Labels from the root down to and including this node
    pub path: Vec<String>,
    pub payload: Payload,
}

impl FlatRow {
    pub fn joined_path(&self, separator: &str) -> String {
        self.path.join(separator)
    }
}

/// One row per node of `nodes`, in the given order.
pub fn flatten<'a, I>(tree: &BomTree, nodes: I, label_key: &str) -> Vec<FlatRow>
where
    I: IntoIterator<Item = &'a BomNode>,
{
    nodes
        .into_iter()
        .map(|node| {
            let mut path: Vec<String> = tree
                .ancestors(node.id)
                .into_iter()
                .rev()
                .filter_map(|a| tree.get(a))
                .map(|a| a.label(label_key))
                .collect();
            path.push(node.label(label_key));
            FlatRow {
                level: node.level,
                path,
                payload: node.payload.clone(),
            }
        })
        .collect()
}

/// Every node, pre-order.
pub fn flatten_tree(tree: &BomTree, label_key: &str) -> Vec<FlatRow> {
    flatten(tree, tree.iter(), label_key)
}

/// Rebuild a forest from levelled rows.
///
/// A row at level L becomes the last child of the most recent row at
/// level L-1; level 0 rows become roots. Ids are freshly allocated.
/// Row numbers in errors are 1-based.
#[instrument(level = "debug", skip(rows))]
pub fn rebuild<I>(rows: I) -> DomainResult<BomTree>
where
    I: IntoIterator<Item = (usize, Payload)>,
{
    let mut tree = BomTree::new();
    // last_seen[l] = most recent node at level l
    let mut last_seen: Vec<NodeId> = Vec::new();

    for (idx, (level, payload)) in rows.into_iter().enumerate() {
        let parent = match level {
            0 => None,
            l if l <= last_seen.len() => Some(last_seen[l - 1]),
            l => return Err(DomainError::InvalidLevel { row: idx + 1, level: l }),
        };
        let id = tree.insert_node(parent, level, payload);
        tree.attach(id, parent, usize::MAX);
        last_seen.truncate(level);
        last_seen.push(id);
    }

    debug!("rebuilt {} nodes, {} roots", tree.len(), tree.root_ids().len());
    Ok(tree)
}
