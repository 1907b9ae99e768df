//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.orgpulse.toml` files.

use crate::cli::{OutputFormat, View};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".orgpulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Watch-mode settings.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Dashboard backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the API prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Login email; the password only comes from the CLI or environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            email: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default view.
    #[serde(default)]
    pub view: View,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Deepest level to render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Rows in the most-delayed table.
    #[serde(default = "default_top_delayed")]
    pub top_delayed: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            view: View::default(),
            format: OutputFormat::default(),
            max_depth: None,
            top_delayed: default_top_delayed(),
        }
    }
}

fn default_top_delayed() -> usize {
    5
}

/// Watch-mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Refresh interval in seconds.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
        }
    }
}

fn default_interval() -> u64 {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.orgpulse.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(ref email) = args.email {
            self.api.email = Some(email.clone());
        }

        if let Some(view) = args.view {
            self.report.view = view;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if args.max_depth.is_some() {
            self.report.max_depth = args.max_depth;
        }

        if let Some(Some(interval)) = args.watch {
            self.watch.interval_seconds = interval;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080/api/v1");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.report.view, View::Heatmap);
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert_eq!(config.watch.interval_seconds, 60);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
base_url = "https://dash.example.com/api/v1"
email = "ops@example.com"

[report]
view = "tree"
format = "json"
max_depth = 2

[watch]
interval_seconds = 15
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "https://dash.example.com/api/v1");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.api.email.as_deref(), Some("ops@example.com"));
        assert_eq!(config.report.view, View::Tree);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.max_depth, Some(2));
        assert_eq!(config.report.top_delayed, 5);
        assert_eq!(config.watch.interval_seconds, 15);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str("[report]\nview = \"tree\"\n").unwrap();
        let args = crate::cli::Args::try_parse_from([
            "orgpulse",
            "--api-url",
            "http://127.0.0.1:9000/api/v1",
            "--format",
            "text",
        ])
        .unwrap();

        config.merge_with_args(&args);

        assert_eq!(config.api.base_url, "http://127.0.0.1:9000/api/v1");
        assert_eq!(config.report.view, View::Tree);
        assert_eq!(config.report.format, OutputFormat::Text);
    }

    #[test]
    fn test_bare_watch_keeps_file_interval() {
        let mut config: Config = toml::from_str("[watch]\ninterval_seconds = 5\n").unwrap();
        let args = crate::cli::Args::try_parse_from(["orgpulse", "--watch"]).unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.watch.interval_seconds, 5);

        let args = crate::cli::Args::try_parse_from(["orgpulse", "--watch", "60"]).unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.watch.interval_seconds, 60);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(CONFIG_FILE), "[watch]\ninterval_seconds = 5\n").unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.watch.interval_seconds, 5);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[report]\nview = 42\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[watch]"));
        assert!(toml_str.contains("view = \"heatmap\""));
    }
}
