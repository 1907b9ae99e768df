//! Forest-wide statistics.
//!
//! This module provides utilities for summarizing a built organization
//! forest: status breakdowns, rankings, and flattened listings.

use crate::models::DelayStatus;
use crate::tree::{OrgRecord, ProjectCounts, TreeNode};
use serde::Serialize;

/// Summary of a forest's delay situation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBreakdown {
    /// Number of organizations (all depths).
    pub organizations: usize,
    /// Organizations whose subtree status is red.
    pub red_orgs: usize,
    /// Organizations whose subtree status is yellow.
    pub yellow_orgs: usize,
    /// Organizations whose subtree status is green.
    pub green_orgs: usize,
    /// Project counts summed over the roots' subtrees.
    pub projects: ProjectCounts,
}

impl StatusBreakdown {
    /// Creates a breakdown from a list of root nodes.
    pub fn from_roots<R: OrgRecord>(roots: &[TreeNode<R>]) -> Self {
        let mut breakdown = Self {
            projects: roots.iter().map(|r| r.stats.counts).sum(),
            ..Self::default()
        };

        for (_, node) in flatten(roots) {
            breakdown.organizations += 1;
            match node.stats.status {
                DelayStatus::Red => breakdown.red_orgs += 1,
                DelayStatus::Yellow => breakdown.yellow_orgs += 1,
                DelayStatus::Green => breakdown.green_orgs += 1,
            }
        }

        breakdown
    }

    /// Overall share of red projects.
    pub fn delay_rate(&self) -> f64 {
        self.projects.rate()
    }
}

/// Pre-order listing of every node with its depth (roots at 0).
pub fn flatten<R>(roots: &[TreeNode<R>]) -> Vec<(usize, &TreeNode<R>)> {
    let mut out = Vec::new();
    let mut pending: Vec<(usize, &TreeNode<R>)> = roots.iter().rev().map(|n| (0, n)).collect();
    while let Some((depth, node)) = pending.pop() {
        out.push((depth, node));
        pending.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
    }
    out
}

/// The `n` organizations with the highest subtree delay rate.
///
/// Ties are broken by red project count; organizations without red
/// projects are left out.
pub fn most_delayed<R>(roots: &[TreeNode<R>], n: usize) -> Vec<&TreeNode<R>> {
    let mut delayed: Vec<_> = flatten(roots)
        .into_iter()
        .map(|(_, node)| node)
        .filter(|node| node.stats.counts.red > 0)
        .collect();

    delayed.sort_by(|a, b| {
        b.stats
            .rate
            .partial_cmp(&a.stats.rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.stats.counts.red.cmp(&a.stats.counts.red))
    });
    delayed.truncate(n);

    delayed
}

/// Highest subtree status among the roots, `None` for an empty forest.
pub fn worst_status<R>(roots: &[TreeNode<R>]) -> Option<DelayStatus> {
    roots.iter().map(|r| r.stats.status).max()
}

/// Generate a text summary of a breakdown.
pub fn generate_summary_text(breakdown: &StatusBreakdown) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Organizations: {} | Projects: {} | Delay rate: {:.0}%",
        breakdown.organizations,
        breakdown.projects.total,
        breakdown.delay_rate() * 100.0
    ));
    lines.push(format!(
        "- {} {}: {} orgs, {} projects",
        DelayStatus::Red.emoji(),
        DelayStatus::Red.label(),
        breakdown.red_orgs,
        breakdown.projects.red
    ));
    lines.push(format!(
        "- {} {}: {} orgs, {} projects",
        DelayStatus::Yellow.emoji(),
        DelayStatus::Yellow.label(),
        breakdown.yellow_orgs,
        breakdown.projects.yellow
    ));
    lines.push(format!(
        "- {} {}: {} orgs, {} projects",
        DelayStatus::Green.emoji(),
        DelayStatus::Green.label(),
        breakdown.green_orgs,
        breakdown.projects.green
    ));

    lines.join("\n")
}
