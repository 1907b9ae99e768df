//! Organization hierarchy: forest construction, subtree aggregation,
//! and the presentation shapes built on top of it.

pub mod builder;
pub mod node;
pub mod query;
pub mod views;

pub use builder::{build_forest, ForestDiagnostics};
pub use node::{OrgRecord, ProjectCounts, TreeNode};
pub use query::{filter_by_name, find_node, selectable_parents};
pub use views::{DashboardOrgNode, OrganizationTreeNode};
