//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// OrgPulse - delivery-delay heatmap for your organization tree
///
/// Fetches organizations from the dashboard backend (or a JSON file),
/// rolls project delay counts up the hierarchy, and renders the result.
///
/// Examples:
///   orgpulse --api-url http://localhost:8080/api/v1 --email me@example.com
///   orgpulse --input orgs.json --view tree --format text
///   orgpulse --input summary.json --fail-on red
///   orgpulse --token $TOKEN --watch 60 --output heatmap.md
///   orgpulse --input summary.json --watch
///   orgpulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dashboard API base URL (including the /api/v1 prefix)
    #[arg(long, value_name = "URL", env = "ORGPULSE_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for the API (skips login)
    #[arg(long, env = "ORGPULSE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Login email
    #[arg(long, env = "ORGPULSE_EMAIL")]
    pub email: Option<String>,

    /// Login password
    #[arg(long, env = "ORGPULSE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Read organizations from a JSON file instead of the API
    ///
    /// Accepts a bare array of organizations or a dashboard summary object.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Which view to render
    #[arg(long, value_name = "VIEW")]
    pub view: Option<View>,

    /// Output format (markdown, text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Only show organizations whose name (or a descendant's) contains this text
    #[arg(short, long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Only show the subtree rooted at this organization id
    #[arg(long, value_name = "ID")]
    pub org: Option<i64>,

    /// Deepest hierarchy level to render (0 = roots only)
    #[arg(long, value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    /// List organizations that may become the new parent of ID and exit
    #[arg(long, value_name = "ID", conflicts_with = "watch")]
    pub parent_candidates: Option<i64>,

    /// Exit with code 2 if any top-level organization is at or above this status
    #[arg(long, value_name = "STATUS")]
    pub fail_on: Option<FailOnLevel>,

    /// Refresh until interrupted, every SECS seconds
    ///
    /// Without a value the interval comes from `[watch] interval_seconds`.
    #[arg(long, value_name = "SECS", num_args = 0..=1)]
    pub watch: Option<Option<u64>>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .orgpulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .orgpulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Which presentation of the hierarchy to render.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Dashboard heatmap with delay rates (default)
    #[default]
    Heatmap,
    /// Organization tree with subtree counts
    Tree,
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            View::Heatmap => write!(f, "heatmap"),
            View::Tree => write!(f, "tree"),
        }
    }
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// Indented plain-text tree
    Text,
    /// JSON format
    Json,
}

/// Status threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Yellow,
    Red,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(Some(watch)) = self.watch {
            if watch == 0 {
                return Err("Watch interval must be at least 1 second".to_string());
            }
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Validate input file if provided
        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
