//! Plain-text renderings of a document: row table and termtree view.

use std::collections::HashMap;

use itertools::Itertools;
use termtree::Tree;

use crate::domain::{BomDocument, BomNode, BomTree, Column, ExpansionState, NodeId};

/// 1-based row number of every node in the fully expanded order.
pub fn row_numbers(tree: &BomTree) -> HashMap<NodeId, usize> {
    tree.iter().enumerate().map(|(i, n)| (n.id, i + 1)).collect()
}

/// Node at 1-based `row` of the fully expanded order.
pub fn node_at_row(tree: &BomTree, row: usize) -> Option<NodeId> {
    row.checked_sub(1)
        .and_then(|i| tree.iter().nth(i))
        .map(|n| n.id)
}

/// Schema columns that are not hidden and hold at least one value.
pub fn display_columns<'a>(doc: &'a BomDocument, hidden: &[String]) -> Vec<&'a Column> {
    doc.columns
        .iter()
        .filter(|c| !hidden.contains(&c.key))
        .filter(|c| doc.tree().iter().any(|n| n.payload.contains_key(&c.key)))
        .collect()
}

fn marker(node: &BomNode, expansion: &ExpansionState) -> &'static str {
    match (node.has_children(), expansion.is_expanded(node.id)) {
        (false, _) => "·",
        (true, true) => "▾",
        (true, false) => "▸",
    }
}

/// Header line followed by one line per node.
pub fn table<'a, I>(
    tree: &BomTree,
    nodes: I,
    expansion: &ExpansionState,
    columns: &[&Column],
) -> Vec<String>
where
    I: IntoIterator<Item = &'a BomNode>,
{
    let numbers = row_numbers(tree);
    let mut grid: Vec<Vec<String>> = vec![std::iter::once("#".to_string())
        .chain(std::iter::once("item".to_string()))
        .chain(columns.iter().map(|c| c.label.clone()))
        .collect()];

    for node in nodes {
        let mut line = vec![
            numbers.get(&node.id).map(|n| n.to_string()).unwrap_or_default(),
            format!("{}{}", "  ".repeat(node.level), marker(node, expansion)),
        ];
        line.extend(
            columns
                .iter()
                .map(|c| node.field(&c.key).map(|v| v.to_string()).unwrap_or_default()),
        );
        grid.push(line);
    }

    let widths: Vec<usize> = (0..grid[0].len())
        .map(|col| {
            grid.iter()
                .map(|line| line[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    grid.iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}

/// One termtree per root; children of collapsed nodes are summarised.
pub fn to_termtrees(tree: &BomTree, expansion: &ExpansionState) -> Vec<Tree<String>> {
    fn build(tree: &BomTree, expansion: &ExpansionState, node: &BomNode) -> Tree<String> {
        let hidden = tree.subtree_ids(node.id).len() - 1;
        if hidden > 0 && !expansion.is_expanded(node.id) {
            return Tree::new(format!("{} (+{})", node, hidden));
        }
        let leaves: Vec<_> = node
            .children
            .iter()
            .filter_map(|&c| tree.get(c))
            .map(|c| build(tree, expansion, c))
            .collect();
        Tree::new(node.to_string()).with_leaves(leaves)
    }

    tree.root_ids()
        .iter()
        .filter_map(|&r| tree.get(r))
        .map(|root| build(tree, expansion, root))
        .collect()
}
