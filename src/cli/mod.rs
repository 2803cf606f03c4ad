//! Command-line interface for harvester.
//!
//! Provides commands for running an ingestion crawl, listing the source
//! catalog and showing the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{HttpFetcher, RedditClient};
use crate::config::{self, RedditCredentials};
use crate::core::{Orchestrator, RunReport};
use crate::dataset::DatasetDirectory;
use crate::domain::select_sources;

/// harvester - Community media feeds into an image dataset
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the catalog into a dataset directory
    Scrape {
        /// Path to the dataset directory
        data_dir: PathBuf,

        /// Only crawl these catalog ids (repeatable)
        #[arg(short, long = "source")]
        sources: Vec<String>,
    },

    /// List the source catalog in crawl order
    Sources,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Scrape { data_dir, sources } => scrape(data_dir, &sources).await,
            Commands::Sources => list_sources(),
            Commands::Config => show_config(),
        }
    }
}

/// Run an ingestion crawl
async fn scrape(data_dir: PathBuf, selected: &[String]) -> Result<()> {
    let cfg = config::config()?;

    // Fatal before any network activity
    let credentials = RedditCredentials::from_env()?;

    let (sources, unknown) = select_sources(&cfg.sources, selected);
    if !unknown.is_empty() {
        anyhow::bail!("Unknown source(s): {}", unknown.join(", "));
    }

    let dataset = DatasetDirectory::open(&data_dir)
        .await
        .with_context(|| format!("Failed to open dataset: {}", data_dir.display()))?;
    eprintln!(
        "Dataset {} holds {} image(s)",
        dataset.root().display(),
        dataset.len()
    );

    let client = RedditClient::new(credentials, cfg.reddit.clone())
        .context("Failed to create Reddit client")?;
    let fetcher =
        HttpFetcher::new(&cfg.reddit.user_agent).context("Failed to create HTTP client")?;

    let orchestrator = Orchestrator::new(
        Arc::new(client),
        Arc::new(fetcher),
        Arc::new(dataset),
        cfg.ingest.clone(),
        cfg.reddit.submission_limit,
    );

    let report = orchestrator.run(&sources).await;
    print_report(&report);

    // Partial ingestion is a normal outcome
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!(
        "{:<22} {:>7} {:>8} {:>7} {:>7}  {}",
        "SOURCE", "SAVED", "SKIPPED", "FAILED", "FILES", "NOTE"
    );
    println!("{}", "-".repeat(75));

    for source in &report.sources {
        let note = source.unavailable.as_deref().unwrap_or("");
        println!(
            "{:<22} {:>7} {:>8} {:>7} {:>7}  {}",
            source.source_id,
            source.saved(),
            source.skipped(),
            source.failed(),
            source.files(),
            note
        );
    }

    println!("\nRun {}: {} new file(s)", report.run_id, report.total_files());
}

/// List the catalog
fn list_sources() -> Result<()> {
    let cfg = config::config()?;

    println!("{:<4} {:<22} {}", "#", "SOURCE", "DESCRIPTION");
    println!("{}", "-".repeat(60));

    for (idx, source) in cfg.sources.iter().enumerate() {
        println!("{:<4} {:<22} {}", idx + 1, source.id, source.description);
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none - using defaults)".to_string()));
    println!();
    println!("Reddit:");
    println!("  User agent:       {}", cfg.reddit.user_agent);
    println!("  Submission limit: {}", cfg.reddit.submission_limit);
    println!("  Time filter:      {}", cfg.reddit.time_filter);
    println!();
    println!("Ingest:");
    println!("  Fetch timeout:    {}s", cfg.ingest.fetch_timeout.as_secs());
    let concurrency = match cfg.ingest.max_concurrent_submissions {
        0 => "unbounded".to_string(),
        n => n.to_string(),
    };
    println!("  Concurrency:      {}", concurrency);
    println!("  Dedup:            {:?}", cfg.ingest.dedup);
    println!("  On media error:   {:?}", cfg.ingest.on_media_error);
    println!();
    println!("Credentials:");
    for var in [config::CLIENT_ID_VAR, config::CLIENT_SECRET_VAR] {
        let state = if std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            "set"
        } else {
            "MISSING"
        };
        println!("  {:<22} {}", var, state);
    }
    println!();
    println!("Sources: {}", cfg.sources.len());

    Ok(())
}
