//! Where the flat organization list comes from.

use crate::api::client::{ApiClient, Session};
use crate::models::{DashboardOrg, OrgListing, Organization};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

/// Source of organization records: the live backend or a JSON file.
pub enum OrgSource {
    File(PathBuf),
    Api { client: ApiClient, session: Session },
}

impl OrgSource {
    /// Short description for log lines and report metadata.
    pub fn describe(&self) -> String {
        match self {
            OrgSource::File(path) => path.display().to_string(),
            OrgSource::Api { client, .. } => client.endpoint(""),
        }
    }

    /// Organization rows from the dashboard summary.
    pub async fn dashboard_orgs(&self) -> Result<Vec<DashboardOrg>> {
        match self {
            OrgSource::File(path) => load_records(path).await,
            OrgSource::Api { client, session } => {
                let summary = client
                    .fetch_dashboard_summary(session)
                    .await
                    .context("Failed to fetch dashboard summary")?;
                info!(
                    "Dashboard summary: {} organizations, {} projects",
                    summary.organizations.len(),
                    summary.total_projects
                );
                Ok(summary.organizations)
            }
        }
    }

    /// Rows from the organization listing.
    pub async fn organizations(&self) -> Result<Vec<Organization>> {
        match self {
            OrgSource::File(path) => load_records(path).await,
            OrgSource::Api { client, session } => client
                .fetch_organizations(session)
                .await
                .context("Failed to fetch organizations"),
        }
    }
}

/// Read a JSON file holding either an array of records or a dashboard summary.
pub async fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let listing: OrgListing<T> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file: {}", path.display()))?;

    let records = listing.into_records();
    info!("Loaded {} organizations from {}", records.len(), path.display());
    Ok(records)
}
