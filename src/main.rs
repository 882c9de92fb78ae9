//! Sumi-Roster main entry point
//!
//! This is the command-line interface for the Sumi-Roster discovery crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_roster::config::{load_config_with_hash, Config};
use sumi_roster::crawler::{Coordinator, DriveLimits, SessionJob};
use sumi_roster::gateway::{Gateways, HttpFetcher, LlmGateway};
use sumi_roster::output::{
    load_snapshots, print_statistics, write_markdown_report, DiscoveryReport,
    JsonSnapshotHandler, MarkdownOutputHandler, OutputHandler, RunStatistics,
};
use sumi_roster::RosterDiscoverySession;
use tracing_subscriber::EnvFilter;

/// Sumi-Roster: a roster discovery crawler
///
/// Sumi-Roster walks an organization's website from a single seed URL,
/// classifying pages and links to find where its members are listed, and
/// collects the roster it finds there.
#[derive(Parser, Debug)]
#[command(name = "sumi-roster")]
#[command(version)]
#[command(about = "Discovers organization rosters on the web", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only run the organization with this party id
    #[arg(long, value_name = "ID")]
    party: Option<i64>,

    /// Resume unfinished sessions from the snapshot file
    #[arg(long)]
    resume: bool,

    /// Validate config and show what would be discovered without running
    #[arg(long, conflicts_with_all = ["stats", "export_summary", "resume"])]
    dry_run: bool,

    /// Show statistics from the snapshot file and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary", "resume"])]
    stats: bool,

    /// Regenerate the markdown report from the snapshot file and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "resume"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.party)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export_summary {
        handle_export_summary(&config, &config_hash)
    } else {
        handle_discovery(config, config_hash, cli.party, cli.resume).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_roster=info,warn"),
            1 => EnvFilter::new("sumi_roster=debug,info"),
            2 => EnvFilter::new("sumi_roster=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the resolved requests
fn handle_dry_run(config: &Config, party: Option<i64>) -> anyhow::Result<()> {
    println!("=== Sumi-Roster Dry Run ===\n");

    println!("Discovery Configuration:");
    println!("  Max depth: {}", config.discovery.max_depth);
    println!("  Step budget: {}", config.discovery.step_budget);
    println!(
        "  Confidence threshold: {}",
        config.discovery.confidence_threshold
    );
    match config.discovery.deadline_secs {
        Some(secs) => println!("  Deadline: {}s per session", secs),
        None => println!("  Deadline: none"),
    }
    println!(
        "  Max concurrent sessions: {}",
        config.discovery.max_concurrent_sessions
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nGateway:");
    println!("  Base URL: {}", config.gateway.base_url);
    println!("  Model: {}", config.gateway.model);
    println!("  API key variable: {}", config.gateway.api_key_env);

    println!("\nOutput:");
    println!("  Summary: {}", config.output.summary_path);
    if let Some(snapshot) = &config.output.snapshot_path {
        println!("  Snapshots: {}", snapshot);
    }

    let requests: Vec<_> = config
        .discovery_requests()
        .into_iter()
        .filter(|r| party.map_or(true, |id| r.party_id == id))
        .collect();

    println!("\nOrganizations ({}):", requests.len());
    for request in &requests {
        println!(
            "  - [{}] {} (max depth {}, budget {}, threshold {})",
            request.party_id,
            request.party_name,
            request.max_depth,
            request.step_budget,
            request.confidence_threshold
        );
        println!("    * {}", request.seed_url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start {} discovery sessions", requests.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the snapshot file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = snapshot_path(config)?;
    println!("Snapshots: {}\n", path.display());

    let snapshot = load_snapshots(path)
        .with_context(|| format!("Failed to load snapshots from {}", path.display()))?;

    print_statistics(&RunStatistics::from_sessions(&snapshot.sessions, 0));
    Ok(())
}

/// Handles the --export-summary mode: regenerates the markdown report
fn handle_export_summary(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let path = snapshot_path(config)?;

    println!("=== Exporting Roster Report ===\n");
    println!("Snapshots: {}", path.display());
    println!("Output: {}", config.output.summary_path);
    println!();

    let snapshot = load_snapshots(path)
        .with_context(|| format!("Failed to load snapshots from {}", path.display()))?;

    let reports: Vec<_> = snapshot
        .sessions
        .iter()
        .map(DiscoveryReport::from_session)
        .collect();
    let hash = snapshot.config_hash.as_deref().unwrap_or(config_hash);
    write_markdown_report(&reports, Some(hash), Path::new(&config.output.summary_path))?;

    println!("✓ Report exported to: {}", config.output.summary_path);
    Ok(())
}

/// Handles the main discovery operation
async fn handle_discovery(
    config: Config,
    config_hash: String,
    party: Option<i64>,
    resume: bool,
) -> anyhow::Result<()> {
    let (jobs, carried_over) = if resume {
        resume_jobs(&config, &config_hash, party)?
    } else {
        (start_jobs(&config, party)?, Vec::new())
    };

    if jobs.is_empty() {
        tracing::info!("Nothing to discover");
    }

    let fetcher = HttpFetcher::from_config(&config.user_agent, config.gateway.request_timeout())?;
    let llm = LlmGateway::from_config(&config.gateway, &config.user_agent)?;
    let gateways = Gateways::new(fetcher, llm);

    let mut sinks: Vec<Box<dyn OutputHandler>> = vec![Box::new(
        MarkdownOutputHandler::new(&config.output.summary_path).with_config_hash(&config_hash),
    )];
    if let Some(path) = &config.output.snapshot_path {
        sinks.push(Box::new(
            JsonSnapshotHandler::new(path).with_config_hash(&config_hash),
        ));
    }

    // Finished sessions from the snapshot stay in the outputs
    for session in &carried_over {
        for sink in sinks.iter_mut() {
            sink.record_session(session)?;
        }
    }

    let coordinator = Coordinator::new(gateways, config.discovery.max_concurrent_sessions);
    let report = coordinator
        .run_all(jobs, &mut sinks)
        .await
        .context("Discovery run failed")?;

    let mut sessions = carried_over;
    sessions.extend(report.sessions);
    print_statistics(&RunStatistics::from_sessions(&sessions, report.rejected.len()));

    Ok(())
}

fn start_jobs(config: &Config, party: Option<i64>) -> anyhow::Result<Vec<SessionJob>> {
    let jobs: Vec<_> = config
        .discovery_requests()
        .into_iter()
        .filter(|r| party.map_or(true, |id| r.party_id == id))
        .map(SessionJob::Start)
        .collect();

    if let (Some(id), true) = (party, jobs.is_empty()) {
        bail!("No organization with party id {} in configuration", id);
    }

    tracing::info!(organizations = jobs.len(), "Starting discovery");
    Ok(jobs)
}

/// Splits the snapshot into sessions to resume and finished sessions to keep
fn resume_jobs(
    config: &Config,
    config_hash: &str,
    party: Option<i64>,
) -> anyhow::Result<(Vec<SessionJob>, Vec<RosterDiscoverySession>)> {
    let path = snapshot_path(config)?;
    let snapshot = load_snapshots(path)
        .with_context(|| format!("Failed to load snapshots from {}", path.display()))?;

    if snapshot.config_hash.as_deref().is_some_and(|h| h != config_hash) {
        tracing::warn!("Configuration changed since the snapshot was written");
    }

    let (resumable, carried_over) = snapshot.split_resumable(party);
    let jobs: Vec<SessionJob> = resumable
        .into_iter()
        .map(|session| {
            let limits = limits_for(config, session.party_id());
            SessionJob::Resume { session, limits }
        })
        .collect();

    tracing::info!(
        resuming = jobs.len(),
        kept = carried_over.len(),
        "Loaded snapshot from {}",
        path.display()
    );
    Ok((jobs, carried_over))
}

fn limits_for(config: &Config, party_id: i64) -> DriveLimits {
    match config
        .organizations
        .iter()
        .find(|org| org.party_id == party_id)
    {
        Some(org) => DriveLimits::from(&config.request_for(org)),
        None => DriveLimits {
            step_budget: config.discovery.step_budget,
            confidence_threshold: config.discovery.confidence_threshold,
            deadline: config.discovery.deadline(),
        },
    }
}

fn snapshot_path(config: &Config) -> anyhow::Result<&Path> {
    match &config.output.snapshot_path {
        Some(path) => Ok(Path::new(path)),
        None => bail!("output.snapshot-path is not configured"),
    }
}
