//! Tree node types and subtree statistics.

use crate::models::{DashboardOrg, DelayStatus, Organization};
use serde::Serialize;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Project counts for one organization or one subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectCounts {
    pub total: u64,
    pub red: u64,
    pub yellow: u64,
    pub green: u64,
}

impl ProjectCounts {
    pub fn new(total: u64, red: u64, yellow: u64, green: u64) -> Self {
        Self {
            total,
            red,
            yellow,
            green,
        }
    }

    /// Red wins over yellow, yellow over green.
    pub fn status(&self) -> DelayStatus {
        if self.red > 0 {
            DelayStatus::Red
        } else if self.yellow > 0 {
            DelayStatus::Yellow
        } else {
            DelayStatus::Green
        }
    }

    /// Share of red projects, 0 when there are no projects at all.
    pub fn rate(&self) -> f64 {
        if self.total > 0 {
            self.red as f64 / self.total as f64
        } else {
            0.0
        }
    }
}

/// Saturates at `u64::MAX` instead of overflowing.
impl Add for ProjectCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            total: self.total.saturating_add(rhs.total),
            red: self.red.saturating_add(rhs.red),
            yellow: self.yellow.saturating_add(rhs.yellow),
            green: self.green.saturating_add(rhs.green),
        }
    }
}

impl AddAssign for ProjectCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ProjectCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Aggregated statistics over a node and all of its descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SubtreeStats {
    pub counts: ProjectCounts,
    pub status: DelayStatus,
    pub rate: f64,
}

impl SubtreeStats {
    /// Derive status and rate from the given counts.
    pub fn from_counts(counts: ProjectCounts) -> Self {
        Self {
            counts,
            status: counts.status(),
            rate: counts.rate(),
        }
    }
}

/// Anything that can be placed into an organization forest.
pub trait OrgRecord {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
    fn parent_id(&self) -> Option<i64>;
    /// Counts of projects owned directly by this record, excluding children.
    fn direct_counts(&self) -> ProjectCounts;
}

impl OrgRecord for Organization {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn direct_counts(&self) -> ProjectCounts {
        ProjectCounts::new(
            self.total_projects,
            self.red_projects,
            self.yellow_projects,
            self.green_projects,
        )
    }
}

impl OrgRecord for DashboardOrg {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn direct_counts(&self) -> ProjectCounts {
        ProjectCounts::new(
            self.total_projects,
            self.red_projects,
            self.yellow_projects,
            self.green_projects,
        )
    }
}

/// A record placed in the forest, with its children and subtree statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<R> {
    pub record: R,
    pub children: Vec<TreeNode<R>>,
    pub stats: SubtreeStats,
}

impl<R: OrgRecord> TreeNode<R> {
    /// Wrap a record with no children; statistics start at its own counts.
    pub fn new(record: R) -> Self {
        let stats = SubtreeStats::from_counts(record.direct_counts());
        Self {
            record,
            children: Vec::new(),
            stats,
        }
    }

    pub fn id(&self) -> i64 {
        self.record.id()
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// Tear deep hierarchies down with a work list instead of nested drops.
impl<R> Drop for TreeNode<R> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
