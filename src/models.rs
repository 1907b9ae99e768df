//! Data models for the delay dashboard.
//!
//! This module contains the wire types returned by the dashboard backend:
//! organizations, dashboard summaries, and the authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic-light delay classification of a project or organization.
///
/// Ordered by severity so thresholds can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DelayStatus {
    /// On track
    #[default]
    Green,
    /// At risk
    Yellow,
    /// Overdue or blocked
    Red,
}

impl fmt::Display for DelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayStatus::Green => write!(f, "GREEN"),
            DelayStatus::Yellow => write!(f, "YELLOW"),
            DelayStatus::Red => write!(f, "RED"),
        }
    }
}

impl DelayStatus {
    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            DelayStatus::Green => "🟢",
            DelayStatus::Yellow => "🟡",
            DelayStatus::Red => "🔴",
        }
    }

    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            DelayStatus::Green => "On track",
            DelayStatus::Yellow => "At risk",
            DelayStatus::Red => "Delayed",
        }
    }
}

/// An organization as returned by the organization-listing endpoint.
///
/// Project counts cover only projects owned directly by this organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    /// Materialized path (e.g. `1.4.9`); empty when the source omits it.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub red_projects: u64,
    #[serde(default)]
    pub yellow_projects: u64,
    #[serde(default)]
    pub green_projects: u64,
    #[serde(default)]
    pub delay_status: DelayStatus,
}

/// An organization row from the dashboard summary endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOrg {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub red_projects: u64,
    #[serde(default)]
    pub yellow_projects: u64,
    #[serde(default)]
    pub green_projects: u64,
    #[serde(default)]
    pub delay_status: DelayStatus,
    /// Share of red projects (0.0 - 1.0) as computed by the backend.
    #[serde(default)]
    pub delay_rate: f64,
}

/// Response of `GET /dashboard/summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub red_projects: u64,
    #[serde(default)]
    pub yellow_projects: u64,
    #[serde(default)]
    pub green_projects: u64,
    #[serde(default)]
    pub total_issues: u64,
    #[serde(default)]
    pub red_issues: u64,
    #[serde(default)]
    pub yellow_issues: u64,
    #[serde(default)]
    pub green_issues: u64,
    #[serde(default)]
    pub organizations: Vec<DashboardOrg>,
}

/// Contents of an offline input file: either a bare organization array
/// or a full dashboard summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrgListing<T> {
    List(Vec<T>),
    Summary { organizations: Vec<T> },
}

impl<T> OrgListing<T> {
    pub fn into_records(self) -> Vec<T> {
        match self {
            OrgListing::List(records) => records,
            OrgListing::Summary { organizations } => organizations,
        }
    }
}

/// Role of a dashboard user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Viewer,
}

/// The authenticated user attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[allow(dead_code)] // Always "Bearer"
    pub token_type: String,
    pub expires_in: u64,
    pub user: AuthUser,
}
