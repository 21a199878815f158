use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peersift_core::{
    validate_config, AdapterRegistry, BatchReport, CandidateItem, Config, Coordinator, Decision,
    HttpFetcher, SanitizedConfig,
};

/// Filter NexusPHP tracker links by promotion state.
///
/// Reads candidate detail-page links, fetches each one with the
/// configured session cookie, and prints an ACCEPT or REJECT line per
/// link according to the configured policy.
#[derive(Debug, Parser)]
#[command(name = "peersift", version)]
struct Cli {
    /// File with one candidate link per line; reads stdin when omitted.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    links_file: Option<PathBuf>,

    /// Path to the configuration file.
    ///
    /// Falls back to the PEERSIFT_CONFIG environment variable, then to
    /// `peersift.toml` in the working directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    info!("Loading configuration from {:?}", config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;
    tracing::debug!(config = ?SanitizedConfig::from(&config), "Configuration loaded");

    let links = read_links(cli.links_file.as_deref())?;
    if links.is_empty() {
        warn!("No links to filter");
        println!("0 accepted, 0 rejected, 0 failed");
        return Ok(ExitCode::SUCCESS);
    }
    info!("Filtering {} links", links.len());

    let fetcher = HttpFetcher::new(&config.fetch).context("Failed to build HTTP client")?;
    let registry = AdapterRegistry::from_config(&config).context("Failed to build site adapters")?;
    let coordinator = Coordinator::new(config, Arc::new(fetcher), registry);

    let items = links.into_iter().map(CandidateItem::new).collect();
    match coordinator.run(items).await {
        Ok(report) => {
            print_report(&report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Batch failed: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}

fn default_config_path() -> PathBuf {
    std::env::var("PEERSIFT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("peersift.toml"))
}

/// Read candidate links from a file, or from stdin when no file is
/// given. Blank lines and `#` comments are skipped.
fn read_links(path: Option<&Path>) -> Result<Vec<String>> {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open links file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut links = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read links")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        links.push(line.to_string());
    }
    Ok(links)
}

fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.decision {
            Decision::Accepted => println!("ACCEPT {}", outcome.item.link),
            Decision::Rejected { reason, .. } => {
                println!("REJECT {} - {}", outcome.item.link, reason);
            }
        }
    }
    for failure in &report.failures {
        eprintln!("FAIL {} - {}", failure.link, failure.error);
    }
    println!(
        "{} accepted, {} rejected, {} failed",
        report.accepted_count(),
        report.rejected_count(),
        report.failed_count()
    );
}
