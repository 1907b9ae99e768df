//! Forest construction and bottom-up statistic propagation.
//!
//! Records are grouped by `parent_id` in a single pass and assembled from
//! the roots down. A record whose parent id does not resolve is dropped
//! together with everything below it; it is never promoted to a root.

use crate::tree::node::{OrgRecord, ProjectCounts, SubtreeStats, TreeNode};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Errors raised while building a forest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Some records form a parent loop and can never reach a root.
    #[error("cyclic organization hierarchy detected among organizations {ids:?}")]
    CyclicHierarchy { ids: Vec<i64> },
}

/// What the builder had to leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForestDiagnostics {
    /// Records unreachable from any root because an ancestor's parent id is unknown.
    pub dropped: Vec<i64>,
    /// Ids that appeared more than once; the last record with the id was kept.
    pub duplicate_ids: Vec<i64>,
}

impl ForestDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.duplicate_ids.is_empty()
    }
}

/// Root nodes in input order, plus diagnostics.
#[derive(Debug, Clone)]
pub struct Forest<R> {
    pub roots: Vec<TreeNode<R>>,
    pub diagnostics: ForestDiagnostics,
}

impl<R> Forest<R> {
    /// Total number of nodes reachable from the roots.
    pub fn node_count(&self) -> usize {
        let mut pending: Vec<&TreeNode<R>> = self.roots.iter().collect();
        let mut count = 0;
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Build a forest from a flat record list and compute subtree statistics.
pub fn build_forest<R: OrgRecord>(records: Vec<R>) -> Result<Forest<R>, TreeError> {
    let mut diagnostics = ForestDiagnostics::default();

    // A repeated id replaces the earlier record but keeps its position.
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(records.len());
    let mut slots: Vec<Option<R>> = Vec::with_capacity(records.len());
    for record in records {
        match index.get(&record.id()) {
            Some(&slot) => {
                diagnostics.duplicate_ids.push(record.id());
                slots[slot] = Some(record);
            }
            None => {
                index.insert(record.id(), slots.len());
                slots.push(Some(record));
            }
        }
    }
    diagnostics.duplicate_ids.sort_unstable();
    diagnostics.duplicate_ids.dedup();

    let mut root_slots = Vec::new();
    let mut children_of: HashMap<i64, Vec<usize>> = HashMap::new();
    for (i, slot) in slots.iter().enumerate() {
        let Some(record) = slot else { continue };
        match record.parent_id() {
            None => root_slots.push(i),
            Some(parent) if index.contains_key(&parent) => {
                children_of.entry(parent).or_default().push(i)
            }
            Some(_) => {}
        }
    }

    let mut roots: Vec<TreeNode<R>> = root_slots
        .into_iter()
        .filter_map(|i| assemble(i, &mut slots, &children_of))
        .collect();

    let cyclic = find_cycle_members(&slots, &index);
    if !cyclic.is_empty() {
        return Err(TreeError::CyclicHierarchy { ids: cyclic });
    }

    diagnostics.dropped = slots.iter().flatten().map(|r| r.id()).collect();
    if !diagnostics.dropped.is_empty() {
        warn!(
            "Dropped {} organization(s) with unresolvable parent: {:?}",
            diagnostics.dropped.len(),
            diagnostics.dropped
        );
    }
    if !diagnostics.duplicate_ids.is_empty() {
        warn!(
            "Duplicate organization ids (last record kept): {:?}",
            diagnostics.duplicate_ids
        );
    }

    propagate(&mut roots);

    let forest = Forest { roots, diagnostics };
    debug!(
        "Built forest: {} root(s), {} node(s)",
        forest.roots.len(),
        forest.node_count()
    );
    Ok(forest)
}

/// Move the record at `slot` and its descendants out of `slots` into a node.
///
/// Walks with an explicit stack so hierarchy depth is bounded by the heap.
fn assemble<R: OrgRecord>(
    slot: usize,
    slots: &mut [Option<R>],
    children_of: &HashMap<i64, Vec<usize>>,
) -> Option<TreeNode<R>> {
    let child_slots = move |id: i64| children_of.get(&id).map_or(&[][..], Vec::as_slice).iter();

    // A slot can be taken at most once, so revisits end here.
    let record = slots[slot].take()?;
    let root = TreeNode::new(record);
    let mut stack = vec![(child_slots(root.id()), root)];

    loop {
        let (pending, _) = stack.last_mut()?;
        match pending.next() {
            Some(&child) => {
                if let Some(record) = slots[child].take() {
                    let node = TreeNode::new(record);
                    stack.push((child_slots(node.id()), node));
                }
            }
            None => {
                let (_, node) = stack.pop()?;
                match stack.last_mut() {
                    Some((_, parent)) => parent.children.push(node),
                    None => return Some(node),
                }
            }
        }
    }
}

/// Ids of the unplaced records whose parent chain leads back to themselves.
fn find_cycle_members<R: OrgRecord>(slots: &[Option<R>], index: &HashMap<i64, usize>) -> Vec<i64> {
    let parent_slot = |slot: usize| {
        slots[slot]
            .as_ref()
            .and_then(|r| r.parent_id())
            .and_then(|parent| index.get(&parent).copied())
    };

    let mut members = Vec::new();
    for (start, slot) in slots.iter().enumerate() {
        let Some(record) = slot else { continue };

        let mut seen = HashSet::new();
        let mut cursor = start;
        while let Some(parent) = parent_slot(cursor) {
            if parent == start {
                members.push(record.id());
                break;
            }
            if !seen.insert(parent) {
                break;
            }
            cursor = parent;
        }
    }

    members
}

/// Recompute subtree statistics for every node, children before parents.
///
/// Each node ends up with its own direct counts plus the finished counts of
/// its children; status and rate are derived from that sum for leaves and
/// inner nodes alike.
pub fn propagate<R: OrgRecord>(nodes: &mut [TreeNode<R>]) {
    for node in nodes.iter_mut() {
        let children = std::mem::take(&mut node.children);
        node.children = propagate_owned(children);
        restat(node);
    }
}

/// Post-order pass over detached subtrees, without recursion.
fn propagate_owned<R: OrgRecord>(nodes: Vec<TreeNode<R>>) -> Vec<TreeNode<R>> {
    // (node being finished, children still to visit, children finished)
    let mut stack: Vec<(Option<TreeNode<R>>, std::vec::IntoIter<TreeNode<R>>, Vec<TreeNode<R>>)> =
        vec![(None, nodes.into_iter(), Vec::new())];

    loop {
        let Some((_, pending, _)) = stack.last_mut() else {
            return Vec::new();
        };
        match pending.next() {
            Some(mut child) => {
                let grandchildren = std::mem::take(&mut child.children);
                stack.push((Some(child), grandchildren.into_iter(), Vec::new()));
            }
            None => {
                let Some((node, _, finished)) = stack.pop() else {
                    return Vec::new();
                };
                let Some(mut node) = node else {
                    return finished;
                };
                node.children = finished;
                restat(&mut node);
                if let Some((_, _, siblings)) = stack.last_mut() {
                    siblings.push(node);
                }
            }
        }
    }
}

fn restat<R: OrgRecord>(node: &mut TreeNode<R>) {
    let below: ProjectCounts = node.children.iter().map(|c| c.stats.counts).sum();
    node.stats = SubtreeStats::from_counts(node.record.direct_counts() + below);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DelayStatus, Organization};
    use crate::tree::test_support::{make_org, with_counts};

    #[test]
    fn test_empty_input() {
        let forest = build_forest(Vec::<Organization>::new()).unwrap();
        assert!(forest.is_empty());
        assert!(forest.diagnostics.is_clean());
    }

    #[test]
    fn test_roots_keep_input_order() {
        let forest = build_forest(vec![make_org(1, "A", None), make_org(2, "B", None)]).unwrap();
        assert_eq!(forest.roots.len(), 2);
        assert_eq!(forest.roots[0].name(), "A");
        assert_eq!(forest.roots[1].name(), "B");
        assert!(forest.roots[0].children.is_empty());
    }

    #[test]
    fn test_children_nest_under_parent() {
        let forest = build_forest(vec![
            make_org(1, "Root", None),
            make_org(2, "Child", Some(1)),
            make_org(3, "Grandchild", Some(2)),
        ])
        .unwrap();

        assert_eq!(forest.roots.len(), 1);
        let root = &forest.roots[0];
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name(), "Child");
        assert_eq!(root.children[0].children[0].name(), "Grandchild");
        assert_eq!(forest.node_count(), 3);
    }

    #[test]
    fn test_child_listed_before_parent() {
        let forest =
            build_forest(vec![make_org(2, "Child", Some(1)), make_org(1, "Root", None)]).unwrap();
        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.roots[0].children[0].id(), 2);
    }

    #[test]
    fn test_siblings_keep_input_order() {
        let forest = build_forest(vec![
            make_org(1, "Root", None),
            make_org(5, "Zeta", Some(1)),
            make_org(3, "Alpha", Some(1)),
        ])
        .unwrap();
        let names: Vec<_> = forest.roots[0].children.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_counts_propagate_upward() {
        let forest = build_forest(vec![
            with_counts(make_org(1, "Root", None), 1, 0, 0, 1),
            with_counts(make_org(2, "Child", Some(1)), 3, 2, 1, 0),
        ])
        .unwrap();

        let counts = forest.roots[0].stats.counts;
        assert_eq!(counts, ProjectCounts::new(4, 2, 1, 1));
    }

    #[test]
    fn test_propagation_spans_whole_subtree() {
        let forest = build_forest(vec![
            with_counts(make_org(1, "Root", None), 1, 0, 0, 1),
            with_counts(make_org(2, "Mid", Some(1)), 2, 0, 1, 1),
            with_counts(make_org(3, "Leaf", Some(2)), 5, 2, 0, 3),
            with_counts(make_org(4, "Other", Some(1)), 1, 0, 0, 1),
        ])
        .unwrap();

        let root = &forest.roots[0];
        assert_eq!(root.stats.counts, ProjectCounts::new(9, 2, 1, 6));
        assert_eq!(root.children[0].stats.counts, ProjectCounts::new(7, 2, 1, 4));
        assert_eq!(root.stats.counts.total, {
            let c = root.stats.counts;
            c.red + c.yellow + c.green
        });
    }

    #[test]
    fn test_status_red_from_child() {
        let forest = build_forest(vec![
            make_org(1, "Root", None),
            with_counts(make_org(2, "Child", Some(1)), 1, 1, 0, 0),
        ])
        .unwrap();
        assert_eq!(forest.roots[0].stats.status, DelayStatus::Red);
    }

    #[test]
    fn test_status_red_beats_yellow() {
        let forest = build_forest(vec![
            with_counts(make_org(1, "Root", None), 1, 0, 1, 0),
            with_counts(make_org(2, "Child", Some(1)), 1, 1, 0, 0),
        ])
        .unwrap();
        assert_eq!(forest.roots[0].stats.status, DelayStatus::Red);
    }

    #[test]
    fn test_status_yellow_only() {
        let forest = build_forest(vec![
            make_org(1, "Root", None),
            with_counts(make_org(2, "Child", Some(1)), 1, 0, 1, 0),
        ])
        .unwrap();
        assert_eq!(forest.roots[0].stats.status, DelayStatus::Yellow);
    }

    #[test]
    fn test_status_green_overrides_supplied_status() {
        let mut root = make_org(1, "Root", None);
        root.delay_status = DelayStatus::Red;
        let forest = build_forest(vec![
            root,
            with_counts(make_org(2, "Child", Some(1)), 2, 0, 0, 2),
        ])
        .unwrap();
        assert_eq!(forest.roots[0].stats.status, DelayStatus::Green);
    }

    #[test]
    fn test_leaf_stats_equal_direct_counts() {
        let forest =
            build_forest(vec![with_counts(make_org(7, "Solo", None), 4, 1, 2, 1)]).unwrap();
        let leaf = &forest.roots[0];
        assert!(leaf.is_leaf());
        assert_eq!(leaf.stats.counts, ProjectCounts::new(4, 1, 2, 1));
        assert_eq!(leaf.stats.status, DelayStatus::Red);
        assert!((leaf.stats.rate - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_rate_zero_without_projects() {
        let forest = build_forest(vec![make_org(1, "Empty", None)]).unwrap();
        assert_eq!(forest.roots[0].stats.rate, 0.0);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let forest = build_forest(vec![
            with_counts(make_org(1, "Root", None), 1, 0, 0, 1),
            with_counts(make_org(2, "Child", Some(1)), 4, 1, 0, 3),
        ])
        .unwrap();

        assert_eq!(forest.roots.len(), 1);
        let root = &forest.roots[0];
        assert_eq!(root.id(), 1);
        assert_eq!(root.stats.counts, ProjectCounts::new(5, 1, 0, 4));
        assert_eq!(root.stats.status, DelayStatus::Red);
        assert!((root.stats.rate - 0.2).abs() < 1e-9);

        let child = &root.children[0];
        assert_eq!(child.id(), 2);
        assert_eq!(child.stats.counts, ProjectCounts::new(4, 1, 0, 3));
        assert_eq!(child.stats.status, DelayStatus::Red);
        assert!((child.stats.rate - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_orphan_is_dropped() {
        let forest = build_forest(vec![
            make_org(1, "Root", None),
            make_org(2, "Orphan", Some(99)),
            make_org(3, "UnderOrphan", Some(2)),
        ])
        .unwrap();

        assert_eq!(forest.roots.len(), 1);
        assert!(forest.roots[0].children.is_empty());
        assert_eq!(forest.node_count(), 1);
        assert_eq!(forest.diagnostics.dropped, vec![2, 3]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let err = build_forest(vec![
            make_org(1, "Root", None),
            make_org(2, "A", Some(3)),
            make_org(3, "B", Some(2)),
            make_org(4, "Hanger", Some(2)),
        ])
        .unwrap_err();

        assert_eq!(err, TreeError::CyclicHierarchy { ids: vec![2, 3] });
        assert!(err.to_string().contains("cyclic organization hierarchy"));
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = build_forest(vec![make_org(5, "Loop", Some(5))]).unwrap_err();
        assert_eq!(err, TreeError::CyclicHierarchy { ids: vec![5] });
    }

    #[test]
    fn test_duplicate_ids_keep_last_record() {
        let forest = build_forest(vec![
            make_org(1, "Old", None),
            make_org(2, "Child", Some(1)),
            make_org(1, "New", None),
        ])
        .unwrap();

        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.roots[0].name(), "New");
        assert_eq!(forest.roots[0].children.len(), 1);
        assert_eq!(forest.diagnostics.duplicate_ids, vec![1]);
    }

    #[test]
    fn test_duplicate_id_keeps_first_position() {
        let forest = build_forest(vec![
            make_org(1, "Old", None),
            make_org(2, "Other", None),
            make_org(1, "New", None),
        ])
        .unwrap();

        let names: Vec<_> = forest.roots.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["New", "Other"]);
    }

    #[test]
    fn test_deep_chain_builds_without_recursion() {
        const DEPTH: i64 = 100_000;
        let records: Vec<_> = (1..=DEPTH)
            .map(|id| {
                let parent = if id == 1 { None } else { Some(id - 1) };
                with_counts(make_org(id, "Level", parent), 1, 0, 0, 1)
            })
            .collect();

        let forest = build_forest(records).unwrap();

        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.node_count(), DEPTH as usize);
        assert_eq!(forest.roots[0].stats.counts.total, DEPTH as u64);
        assert_eq!(forest.roots[0].stats.counts.green, DEPTH as u64);
        assert_eq!(crate::tree::query::collect_subtree_ids(&forest.roots[0]).len(), DEPTH as usize);
        assert_eq!(crate::analysis::flatten(&forest.roots).last().map(|(d, _)| *d), Some(DEPTH as usize - 1));
    }

    #[test]
    fn test_huge_counts_saturate() {
        let forest = build_forest(vec![
            with_counts(make_org(1, "Root", None), u64::MAX, 0, 0, u64::MAX),
            with_counts(make_org(2, "Child", Some(1)), 1, 1, 0, 0),
        ])
        .unwrap();

        let stats = forest.roots[0].stats;
        assert_eq!(stats.counts.total, u64::MAX);
        assert_eq!(stats.counts.red, 1);
        assert_eq!(stats.status, DelayStatus::Red);
    }

    #[test]
    fn test_propagate_is_idempotent() {
        let mut forest = build_forest(vec![
            with_counts(make_org(1, "Root", None), 1, 0, 0, 1),
            with_counts(make_org(2, "Child", Some(1)), 3, 2, 1, 0),
        ])
        .unwrap();
        let before = forest.roots.clone();
        propagate(&mut forest.roots);
        assert_eq!(forest.roots, before);
    }
}
