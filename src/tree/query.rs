//! Read-only queries over a built forest.

use crate::tree::node::{OrgRecord, TreeNode};
use std::collections::HashSet;

/// Ids of `node` and all of its descendants, the node itself first.
pub fn collect_subtree_ids<R: OrgRecord>(node: &TreeNode<R>) -> Vec<i64> {
    let mut ids = Vec::new();
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        ids.push(node.id());
        pending.extend(node.children.iter().rev());
    }
    ids
}

/// Depth-first search for the node with the given id.
pub fn find_node<R: OrgRecord>(nodes: &[TreeNode<R>], id: i64) -> Option<&TreeNode<R>> {
    let mut pending: Vec<&TreeNode<R>> = nodes.iter().rev().collect();
    while let Some(node) = pending.pop() {
        if node.id() == id {
            return Some(node);
        }
        pending.extend(node.children.iter().rev());
    }
    None
}

/// True if the node's name or any descendant's name contains `query`
/// (case-insensitive).
pub fn matches_search<R: OrgRecord>(node: &TreeNode<R>, query: &str) -> bool {
    let query = query.to_lowercase();
    matches_lowercase(node, &query)
}

fn matches_lowercase<R: OrgRecord>(node: &TreeNode<R>, query: &str) -> bool {
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        if node.name().to_lowercase().contains(query) {
            return true;
        }
        pending.extend(node.children.iter());
    }
    false
}

/// Prune the forest to nodes that match `query` or lead to a match.
///
/// Subtree statistics are left as computed on the full forest. An empty
/// query returns the forest unchanged.
pub fn filter_by_name<R: OrgRecord + Clone>(nodes: &[TreeNode<R>], query: &str) -> Vec<TreeNode<R>> {
    if query.is_empty() {
        return nodes.to_vec();
    }

    let query = query.to_lowercase();
    prune(nodes, &query)
}

fn prune<R: OrgRecord + Clone>(nodes: &[TreeNode<R>], query: &str) -> Vec<TreeNode<R>> {
    nodes
        .iter()
        .filter(|node| matches_lowercase(*node, query))
        .map(|node| TreeNode {
            record: node.record.clone(),
            children: prune(&node.children, query),
            stats: node.stats,
        })
        .collect()
}

/// Ids that may become the new parent of `editing_id`: everything in the
/// forest except the organization itself and its descendants.
///
/// When `editing_id` is not in the forest every id is selectable.
pub fn selectable_parents<R: OrgRecord>(nodes: &[TreeNode<R>], editing_id: i64) -> Vec<i64> {
    let excluded: HashSet<i64> = find_node(nodes, editing_id)
        .map(|node| collect_subtree_ids(node).into_iter().collect())
        .unwrap_or_default();

    nodes
        .iter()
        .flat_map(collect_subtree_ids)
        .filter(|id| !excluded.contains(id))
        .collect()
}
