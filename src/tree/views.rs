//! Presentation shapes for the two consumers of the forest.
//!
//! The heatmap writes subtree statistics over the record's own count,
//! status and rate fields. The organization tree keeps the record intact
//! and exposes the statistics under `subtree_*` names.

use crate::models::{DashboardOrg, DelayStatus, Organization};
use crate::tree::builder::{build_forest, TreeError};
use crate::tree::node::TreeNode;
use serde::Serialize;

/// Heatmap node: dashboard record with subtree-inclusive figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOrgNode {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub level: u32,
    pub total_projects: u64,
    pub red_projects: u64,
    pub yellow_projects: u64,
    pub green_projects: u64,
    pub delay_status: DelayStatus,
    pub delay_rate: f64,
    pub children: Vec<DashboardOrgNode>,
}

impl From<TreeNode<DashboardOrg>> for DashboardOrgNode {
    fn from(mut node: TreeNode<DashboardOrg>) -> Self {
        let children = std::mem::take(&mut node.children);
        let stats = node.stats;
        let record = &node.record;

        Self {
            id: record.id,
            name: record.name.clone(),
            parent_id: record.parent_id,
            level: record.level,
            total_projects: stats.counts.total,
            red_projects: stats.counts.red,
            yellow_projects: stats.counts.yellow,
            green_projects: stats.counts.green,
            delay_status: stats.status,
            delay_rate: stats.rate,
            children: children.into_iter().map(Self::from).collect(),
        }
    }
}

/// Organization-listing node: the original record plus `subtree_*` figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationTreeNode {
    #[serde(flatten)]
    pub organization: Organization,
    pub children: Vec<OrganizationTreeNode>,
    pub subtree_total: u64,
    pub subtree_red: u64,
    pub subtree_yellow: u64,
    pub subtree_green: u64,
    pub subtree_status: DelayStatus,
}

impl From<TreeNode<Organization>> for OrganizationTreeNode {
    fn from(mut node: TreeNode<Organization>) -> Self {
        let children = std::mem::take(&mut node.children);
        let stats = node.stats;

        Self {
            organization: node.record.clone(),
            children: children.into_iter().map(Self::from).collect(),
            subtree_total: stats.counts.total,
            subtree_red: stats.counts.red,
            subtree_yellow: stats.counts.yellow,
            subtree_green: stats.counts.green,
            subtree_status: stats.status,
        }
    }
}

/// Build the heatmap forest from dashboard rows.
#[allow(dead_code)] // Convenience for callers that do not need diagnostics
pub fn build_dashboard_tree(orgs: Vec<DashboardOrg>) -> Result<Vec<DashboardOrgNode>, TreeError> {
    let forest = build_forest(orgs)?;
    Ok(forest.roots.into_iter().map(DashboardOrgNode::from).collect())
}

/// Build the organization-listing forest.
#[allow(dead_code)] // Convenience for callers that do not need diagnostics
pub fn build_organization_tree(
    orgs: Vec<Organization>,
) -> Result<Vec<OrganizationTreeNode>, TreeError> {
    let forest = build_forest(orgs)?;
    Ok(forest
        .roots
        .into_iter()
        .map(OrganizationTreeNode::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::test_support::{make_org, with_counts};

    fn dashboard_org(id: i64, parent_id: Option<i64>, counts: (u64, u64, u64, u64)) -> DashboardOrg {
        let (total, red, yellow, green) = counts;
        DashboardOrg {
            id,
            name: format!("Org {}", id),
            parent_id,
            level: if parent_id.is_some() { 1 } else { 0 },
            total_projects: total,
            red_projects: red,
            yellow_projects: yellow,
            green_projects: green,
            delay_status: DelayStatus::Green,
            delay_rate: 0.0,
        }
    }

    #[test]
    fn test_dashboard_tree_overwrites_counts() {
        let tree = build_dashboard_tree(vec![
            dashboard_org(1, None, (1, 0, 0, 1)),
            dashboard_org(2, Some(1), (4, 1, 0, 3)),
        ])
        .unwrap();

        let root = &tree[0];
        assert_eq!(root.total_projects, 5);
        assert_eq!(root.red_projects, 1);
        assert_eq!(root.green_projects, 4);
        assert_eq!(root.delay_status, DelayStatus::Red);
        assert!((root.delay_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_dashboard_leaf_rate_is_computed() {
        let tree = build_dashboard_tree(vec![dashboard_org(9, None, (4, 1, 0, 3))]).unwrap();
        assert!((tree[0].delay_rate - 0.25).abs() < 1e-9);
        assert_eq!(tree[0].delay_status, DelayStatus::Red);
    }

    #[test]
    fn test_organization_tree_preserves_direct_counts() {
        let tree = build_organization_tree(vec![
            with_counts(make_org(1, "Root", None), 1, 0, 0, 1),
            with_counts(make_org(2, "Child", Some(1)), 3, 2, 1, 0),
        ])
        .unwrap();

        let root = &tree[0];
        assert_eq!(root.organization.total_projects, 1);
        assert_eq!(root.subtree_total, 4);
        assert_eq!(root.subtree_red, 2);
        assert_eq!(root.subtree_yellow, 1);
        assert_eq!(root.subtree_green, 1);
        assert_eq!(root.subtree_status, DelayStatus::Red);
    }

    #[test]
    fn test_organization_tree_json_shape() {
        let tree = build_organization_tree(vec![make_org(1, "Root", None)]).unwrap();
        let json = serde_json::to_value(&tree[0]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Root");
        assert_eq!(json["subtree_status"], "GREEN");
        assert!(json["children"].as_array().unwrap().is_empty());
        assert!(json.get("delay_rate").is_none());
    }

    #[test]
    fn test_dashboard_json_shape() {
        let tree = build_dashboard_tree(vec![dashboard_org(1, None, (2, 0, 1, 1))]).unwrap();
        let json = serde_json::to_value(&tree[0]).unwrap();

        assert_eq!(json["delay_status"], "YELLOW");
        assert_eq!(json["delay_rate"], 0.0);
        assert!(json.get("subtree_total").is_none());
    }
}
