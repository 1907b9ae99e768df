//! Report generation.
//!
//! Renders an aggregated organization forest as a Markdown report, an
//! indented plain-text tree, or JSON.

use crate::analysis::{flatten, most_delayed, StatusBreakdown};
use crate::models::DelayStatus;
use crate::tree::{ForestDiagnostics, OrgRecord, TreeNode};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Metadata about a rendered report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Input file or backend URL the records came from.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// `heatmap` or `tree`.
    pub view: String,
    /// Active name filter, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Records the builder could not place.
    pub diagnostics: ForestDiagnostics,
}

/// Rendering switches.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Show the delay-rate column (heatmap view).
    pub show_rate: bool,
    /// Deepest level to render; `None` renders everything.
    pub max_depth: Option<usize>,
    /// Rows in the most-delayed table.
    pub top_delayed: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            show_rate: true,
            max_depth: None,
            top_delayed: 5,
        }
    }
}

/// Colour band of a delay rate: 50% and up is red, 20% and up yellow.
pub fn rate_band(rate: f64) -> DelayStatus {
    let pct = (rate * 100.0).round();
    if pct >= 50.0 {
        DelayStatus::Red
    } else if pct >= 20.0 {
        DelayStatus::Yellow
    } else {
        DelayStatus::Green
    }
}

/// Ten-cell text bar for a rate, e.g. `███░░░░░░░ 30%`.
pub fn rate_bar(rate: f64) -> String {
    let pct = (rate.clamp(0.0, 1.0) * 100.0).round() as usize;
    let filled = (pct + 5) / 10;
    format!(
        "{}{} {}%",
        "█".repeat(filled.min(10)),
        "░".repeat(10 - filled.min(10)),
        pct
    )
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report<R: OrgRecord>(
    roots: &[TreeNode<R>],
    metadata: &ReportMetadata,
    options: &ReportOptions,
) -> String {
    let mut output = String::new();

    output.push_str("# OrgPulse Delay Report\n\n");
    output.push_str(&generate_metadata_section(metadata));

    let breakdown = StatusBreakdown::from_roots(roots);
    output.push_str(&generate_summary_section(&breakdown, options));
    output.push_str(&generate_hierarchy_section(roots, options));
    output.push_str(&generate_delayed_section(roots, options));
    output.push_str(&generate_diagnostics_section(&metadata.diagnostics));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **View:** {}\n", metadata.view));
    if let Some(ref search) = metadata.search {
        section.push_str(&format!("- **Filter:** `{}`\n", search));
    }
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(breakdown: &StatusBreakdown, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} Delayed | {} At risk | {} On track | **Projects** |\n",
        DelayStatus::Red.emoji(),
        DelayStatus::Yellow.emoji(),
        DelayStatus::Green.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        breakdown.projects.red,
        breakdown.projects.yellow,
        breakdown.projects.green,
        breakdown.projects.total
    ));

    section.push_str(&format!(
        "Organizations: {} ({} delayed, {} at risk, {} on track)\n\n",
        breakdown.organizations, breakdown.red_orgs, breakdown.yellow_orgs, breakdown.green_orgs
    ));

    if options.show_rate {
        section.push_str(&format!(
            "Overall delay rate: {}\n\n",
            rate_bar(breakdown.delay_rate())
        ));
    }

    section
}

/// Generate the hierarchy table.
fn generate_hierarchy_section<R: OrgRecord>(roots: &[TreeNode<R>], options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Organizations\n\n");

    if roots.is_empty() {
        section.push_str("No organizations to show.\n\n");
        return section;
    }

    if options.show_rate {
        section.push_str("| Organization | Status | Total | 🔴 | 🟡 | 🟢 | Delay rate |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---|\n");
    } else {
        section.push_str("| Organization | Status | Total | 🔴 | 🟡 | 🟢 |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");
    }

    for (depth, node) in visible(roots, options) {
        let indent = "&nbsp;&nbsp;".repeat(depth * 2);
        let name = if depth == 0 {
            format!("**{}**", escape_cell(node.name()))
        } else {
            escape_cell(node.name())
        };
        let counts = node.stats.counts;

        section.push_str(&format!(
            "| {}{} | {} {} | {} | {} | {} | {} |",
            indent,
            name,
            node.stats.status.emoji(),
            node.stats.status.label(),
            counts.total,
            counts.red,
            counts.yellow,
            counts.green
        ));
        if options.show_rate {
            section.push_str(&format!(
                " {} {} |",
                rate_band(node.stats.rate).emoji(),
                rate_bar(node.stats.rate)
            ));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Generate the most-delayed table.
fn generate_delayed_section<R: OrgRecord>(roots: &[TreeNode<R>], options: &ReportOptions) -> String {
    let delayed = most_delayed(roots, options.top_delayed);
    if delayed.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Most Delayed Organizations\n\n");
    section.push_str("| Organization | Delayed projects | Delay rate |\n");
    section.push_str("|:---|:---:|:---:|\n");

    for node in delayed {
        section.push_str(&format!(
            "| {} | {} / {} | {:.0}% |\n",
            escape_cell(node.name()),
            node.stats.counts.red,
            node.stats.counts.total,
            node.stats.rate * 100.0
        ));
    }
    section.push('\n');

    section
}

/// Generate the diagnostics section (only when something was left out).
fn generate_diagnostics_section(diagnostics: &ForestDiagnostics) -> String {
    if diagnostics.is_clean() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Data Quality\n\n");
    if !diagnostics.dropped.is_empty() {
        section.push_str(&format!(
            "> ⚠️ {} organization(s) omitted because their parent is missing: {}\n\n",
            diagnostics.dropped.len(),
            join_ids(&diagnostics.dropped)
        ));
    }
    if !diagnostics.duplicate_ids.is_empty() {
        section.push_str(&format!(
            "> ⚠️ Duplicate organization ids (last record used): {}\n\n",
            join_ids(&diagnostics.duplicate_ids)
        ));
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by OrgPulse*\n");

    footer
}

/// Generate an indented plain-text tree, one organization per line.
pub fn generate_text_tree<R: OrgRecord>(roots: &[TreeNode<R>], options: &ReportOptions) -> String {
    let mut output = String::new();

    for (depth, node) in visible(roots, options) {
        let counts = node.stats.counts;
        output.push_str(&format!(
            "{}{} {} [{}] total {} / red {} / yellow {} / green {}",
            "  ".repeat(depth),
            node.stats.status.emoji(),
            node.name(),
            node.stats.status,
            counts.total,
            counts.red,
            counts.yellow,
            counts.green
        ));
        if options.show_rate {
            output.push_str(&format!(" / rate {:.0}%", node.stats.rate * 100.0));
        }
        output.push('\n');
    }

    output
}

#[derive(Serialize)]
struct JsonReport<'a, N: Serialize> {
    metadata: &'a ReportMetadata,
    summary: StatusBreakdown,
    organizations: Vec<N>,
}

/// Generate a JSON report; `nodes` are presentation-shaped roots.
pub fn generate_json_report<R, N>(roots: &[TreeNode<R>], metadata: &ReportMetadata) -> Result<String>
where
    R: OrgRecord + Clone,
    N: Serialize + From<TreeNode<R>>,
{
    let report = JsonReport {
        metadata,
        summary: StatusBreakdown::from_roots(roots),
        organizations: roots.iter().cloned().map(N::from).collect::<Vec<N>>(),
    };

    serde_json::to_string_pretty(&report).context("Failed to serialize report")
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn visible<'a, R>(roots: &'a [TreeNode<R>], options: &ReportOptions) -> Vec<(usize, &'a TreeNode<R>)> {
    flatten(roots)
        .into_iter()
        .filter(|(depth, _)| options.max_depth.map_or(true, |max| *depth <= max))
        .collect()
}

/// Keep a pipe in a name from splitting a table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
