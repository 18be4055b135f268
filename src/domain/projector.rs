//! Visibility projector: the single path from tree to rendered list.

use std::collections::HashSet;

use regex::Regex;
use tracing::{instrument, trace};

use crate::domain::node::{BomNode, NodeId};
use crate::domain::tree::BomTree;
use crate::domain::view::ExpansionState;

/// Visible rows of `tree` under `expansion`.
///
/// Pre-order from the roots; children of a node are walked only when the
/// node is expanded. Nothing is computed until iterated.
pub fn project<'a>(tree: &'a BomTree, expansion: &'a ExpansionState) -> Projection<'a> {
    Projection { tree, expansion }
}

/// Restartable view over the visible rows. Holds no cursor; every
/// `iter()` starts again from the roots.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    tree: &'a BomTree,
    expansion: &'a ExpansionState,
}

impl<'a> Projection<'a> {
    pub fn iter(&self) -> VisibleNodes<'a> {
        VisibleNodes {
            tree: self.tree,
            expansion: self.expansion,
            stack: self.tree.root_ids().iter().rev().copied().collect(),
        }
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.iter().map(|n| n.id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.root_ids().is_empty()
    }

    pub fn tree(&self) -> &'a BomTree {
        self.tree
    }
}

impl<'a> IntoIterator for Projection<'a> {
    type Item = &'a BomNode;
    type IntoIter = VisibleNodes<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct VisibleNodes<'a> {
    tree: &'a BomTree,
    expansion: &'a ExpansionState,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for VisibleNodes<'a> {
    type Item = &'a BomNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            // stale ids are skipped, not reported
            if let Some(node) = self.tree.get(current) {
                if self.expansion.is_expanded(current) {
                    self.stack.extend(node.children.iter().rev().copied());
                }
                return Some(node);
            }
        }
        None
    }
}

/// Predicate used by the filtered projection.
pub trait NodeFilter {
    fn matches(&self, node: &BomNode) -> bool;
}

impl<F> NodeFilter for F
where
    F: Fn(&BomNode) -> bool,
{
    fn matches(&self, node: &BomNode) -> bool {
        self(node)
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Lower-cased needle
    Substring(String),
    Pattern(Regex),
}

/// Text search over payload values.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    matcher: Matcher,
    keys: Option<Vec<String>>,
}

impl FieldFilter {
    /// Case-insensitive substring match.
    pub fn contains(term: &str) -> Self {
        Self {
            matcher: Matcher::Substring(term.to_lowercase()),
            keys: None,
        }
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            matcher: Matcher::Pattern(Regex::new(pattern)?),
            keys: None,
        })
    }

    /// Restrict matching to these payload keys.
    pub fn in_fields<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    fn matches_text(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Substring(needle) => text.to_lowercase().contains(needle),
            Matcher::Pattern(re) => re.is_match(text),
        }
    }
}

impl NodeFilter for FieldFilter {
    fn matches(&self, node: &BomNode) -> bool {
        node.payload
            .iter()
            .filter(|(k, _)| self.keys.as_ref().map_or(true, |keys| keys.contains(k)))
            .any(|(_, v)| self.matches_text(&v.to_string()))
    }
}

/// Search view: matches plus every ancestor of a match.
///
/// Ancestors are expanded for this view only; the document's
/// `ExpansionState` is not consulted or changed.
#[instrument(level = "debug", skip_all)]
pub fn project_filtered<'a, F: NodeFilter + ?Sized>(
    tree: &'a BomTree,
    filter: &F,
) -> FilteredProjection<'a> {
    let mut included = HashSet::new();
    for node in tree.iter_postorder() {
        let child_hit = node.children.iter().any(|c| included.contains(c));
        if child_hit || filter.matches(node) {
            included.insert(node.id);
        }
    }
    trace!("filter kept {} of {} nodes", included.len(), tree.len());
    FilteredProjection { tree, included }
}

#[derive(Debug, Clone)]
pub struct FilteredProjection<'a> {
    tree: &'a BomTree,
    included: HashSet<NodeId>,
}

impl<'a> FilteredProjection<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a BomNode> + '_ {
        let tree = self.tree;
        let mut stack: Vec<NodeId> = tree
            .root_ids()
            .iter()
            .rev()
            .filter(|id| self.included.contains(id))
            .copied()
            .collect();
        std::iter::from_fn(move || {
            let node = tree.get(stack.pop()?)?;
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .filter(|c| self.included.contains(c))
                    .copied(),
            );
            Some(node)
        })
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.iter().map(|n| n.id).collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.included.contains(&id)
    }

    /// Nodes shown open in this view.
    pub fn forced_expanded(&self) -> ExpansionState {
        self.included
            .iter()
            .copied()
            .filter(|&id| self.tree.children(id).iter().any(|c| self.included.contains(c)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.included.len()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }
}
