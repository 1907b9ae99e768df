//! OrgPulse - delivery-delay dashboard for organization hierarchies
//!
//! A CLI tool that pulls organizations and their project delay counts
//! from the dashboard backend, rolls the counts up the hierarchy, and
//! renders a heatmap or tree report.
//!
//! Exit codes:
//!   0 - Success (no top-level organization above threshold, or no --fail-on set)
//!   1 - Runtime error (connection, login, config, malformed input, etc.)
//!   2 - A top-level organization is at or above the --fail-on status

mod analysis;
mod api;
mod cli;
mod config;
mod models;
mod report;
mod tree;
mod watch;

use anyhow::{bail, Context, Result};
use api::{ApiClient, ClientConfig, OrgSource, Session};
use chrono::Utc;
use cli::{Args, FailOnLevel, OutputFormat, View};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::{DashboardOrg, DelayStatus, Organization};
use report::{ReportMetadata, ReportOptions};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tree::{DashboardOrgNode, OrgRecord, OrganizationTreeNode, TreeNode};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("OrgPulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", redacted(&args));

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .orgpulse.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", config::CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to set the API URL, default view, and refresh interval.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Copy of the arguments safe to log.
fn redacted(args: &Args) -> Args {
    let mut args = args.clone();
    if args.token.is_some() {
        args.token = Some("***".to_string());
    }
    if args.password.is_some() {
        args.password = Some("***".to_string());
    }
    args
}

/// Run the fetch-aggregate-render workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let source = open_source(&args, &config).await?;
    info!("Reading organizations from {}", source.describe());

    if let Some(editing_id) = args.parent_candidates {
        return handle_parent_candidates(&source, editing_id, args.quiet).await;
    }

    if args.watch.is_some() {
        return run_watch(args, config, source).await;
    }

    let outcome = render_once(&args, &config, &source).await?;
    emit(&args, &outcome.content)?;

    if let Some(ref path) = args.output {
        if !args.quiet {
            eprintln!("✅ Report saved to: {}", path.display());
        }
    }

    Ok(exit_code(args.fail_on, outcome.worst))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Pick the input file or connect (and log in) to the backend.
async fn open_source(args: &Args, config: &Config) -> Result<OrgSource> {
    if let Some(ref input) = args.input {
        return Ok(OrgSource::File(input.clone()));
    }

    let client = ApiClient::new(ClientConfig {
        base_url: config.api.base_url.clone(),
        timeout_seconds: config.api.timeout_seconds,
    })
    .context("Failed to create HTTP client")?;

    let session = if let Some(ref token) = args.token {
        Session::with_token(token.clone())
    } else if let Some((email, password)) = login_credentials(args, config)? {
        let session = client.login(email, password).await.context("Login failed")?;
        if let Some(ref user) = session.user {
            info!("Logged in as {} ({:?})", user.email, user.role);
        }
        session
    } else {
        warn!("No token or credentials given; requesting without authentication");
        Session::anonymous()
    };

    Ok(OrgSource::Api { client, session })
}

/// Email (CLI or config file) and password for a login, if both are set.
fn login_credentials<'a>(args: &'a Args, config: &'a Config) -> Result<Option<(&'a str, &'a str)>> {
    match (config.api.email.as_deref(), args.password.as_deref()) {
        (Some(email), Some(password)) => Ok(Some((email, password))),
        (Some(email), None) => {
            bail!("Login email {} is set but no password was given (--password or ORGPULSE_PASSWORD)", email)
        }
        (None, Some(_)) => {
            bail!("A password was given without a login email (--email, ORGPULSE_EMAIL or [api] email)")
        }
        (None, None) => Ok(None),
    }
}

/// A rendered report plus the worst top-level status it shows.
struct Outcome {
    content: String,
    worst: Option<DelayStatus>,
}

/// Fetch, aggregate and render one report for the configured view.
async fn render_once(args: &Args, config: &Config, source: &OrgSource) -> Result<Outcome> {
    match config.report.view {
        View::Heatmap => {
            let records = with_spinner(args, "Fetching dashboard summary...", source.dashboard_orgs())
                .await?;
            render_view::<DashboardOrg, DashboardOrgNode>(records, args, config, source)
        }
        View::Tree => {
            let records =
                with_spinner(args, "Fetching organizations...", source.organizations()).await?;
            render_view::<Organization, OrganizationTreeNode>(records, args, config, source)
        }
    }
}

fn render_view<R, N>(records: Vec<R>, args: &Args, config: &Config, source: &OrgSource) -> Result<Outcome>
where
    R: OrgRecord + Clone,
    N: Serialize + From<TreeNode<R>>,
{
    let forest = tree::build_forest(records)?;
    let diagnostics = forest.diagnostics.clone();
    let mut roots = forest.roots;

    if let Some(org_id) = args.org {
        let Some(node) = tree::find_node(&roots, org_id) else {
            bail!("Organization {} not found in hierarchy", org_id);
        };
        roots = vec![node.clone()];
    }

    if let Some(ref query) = args.search {
        roots = tree::filter_by_name(&roots, query);
        debug!("Search '{}' kept {} root(s)", query, roots.len());
    }

    let metadata = ReportMetadata {
        source: source.describe(),
        generated_at: Utc::now(),
        view: config.report.view.to_string(),
        search: args.search.clone(),
        diagnostics,
    };

    let options = ReportOptions {
        show_rate: config.report.view == View::Heatmap,
        max_depth: config.report.max_depth,
        top_delayed: config.report.top_delayed,
    };

    let content = match config.report.format {
        OutputFormat::Markdown => report::generate_markdown_report(&roots, &metadata, &options),
        OutputFormat::Text => report::generate_text_tree(&roots, &options),
        OutputFormat::Json => report::generate_json_report::<R, N>(&roots, &metadata)?,
    };

    if !args.quiet {
        let breakdown = analysis::StatusBreakdown::from_roots(&roots);
        info!("{}", analysis::generate_summary_text(&breakdown).replace('\n', " "));
    }

    Ok(Outcome {
        content,
        worst: analysis::worst_status(&roots),
    })
}

/// Await `fut` behind a spinner unless running quietly.
async fn with_spinner<T>(args: &Args, message: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let result = fut.await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result
}

/// Write the rendered report to --output or stdout.
fn emit(args: &Args, content: &str) -> Result<()> {
    match args.output {
        Some(ref path) => report::write_report(content, path),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Handle --parent-candidates: list organizations that may become the new parent.
async fn handle_parent_candidates(source: &OrgSource, editing_id: i64, quiet: bool) -> Result<i32> {
    let records = source.organizations().await?;
    let names: std::collections::HashMap<i64, String> =
        records.iter().map(|o| (o.id, o.name.clone())).collect();

    let forest = tree::build_forest(records)?;
    if tree::find_node(&forest.roots, editing_id).is_none() {
        bail!("Organization {} not found in hierarchy", editing_id);
    }

    let candidates = tree::selectable_parents(&forest.roots, editing_id);
    if !quiet {
        println!("Possible parents for organization {}:\n", editing_id);
    }
    for id in candidates {
        println!("{}\t{}", id, names.get(&id).map(String::as_str).unwrap_or(""));
    }

    Ok(0)
}

/// Handle --watch: re-render on an interval until Ctrl-C.
async fn run_watch(args: Args, config: Config, source: OrgSource) -> Result<i32> {
    if config.watch.interval_seconds == 0 {
        bail!("Watch interval must be at least 1 second");
    }
    let interval = Duration::from_secs(config.watch.interval_seconds);
    info!("Refreshing every {}s (Ctrl-C to stop)", interval.as_secs());

    let args = Arc::new(args);
    let config = Arc::new(config);
    let source = Arc::new(source);

    let (stop, handle) = watch::spawn_poller(interval, move || {
        let args = Arc::clone(&args);
        let config = Arc::clone(&config);
        let source = Arc::clone(&source);
        async move {
            let outcome = render_once(&args, &config, &source).await?;
            emit(&args, &outcome.content)?;
            if let Some(worst) = outcome.worst {
                debug!("Worst top-level status: {}", worst);
            }
            Ok(())
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    stop.stop();

    let ticks = handle.await.context("Refresh task panicked")?;
    info!("Stopped after {} refresh(es)", ticks);
    Ok(0)
}

/// Map the worst top-level status to an exit code.
fn exit_code(fail_on: Option<FailOnLevel>, worst: Option<DelayStatus>) -> i32 {
    let (Some(level), Some(worst)) = (fail_on, worst) else {
        return 0;
    };

    let threshold = match level {
        FailOnLevel::Yellow => DelayStatus::Yellow,
        FailOnLevel::Red => DelayStatus::Red,
    };

    if worst >= threshold {
        eprintln!(
            "\n⛔ Top-level status {} is at or above {:?}. Failing (exit code 2).",
            worst, level
        );
        2
    } else {
        0
    }
}
