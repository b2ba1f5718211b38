//! Bookmatch main entry point
//!
//! This is the command-line interface for the Bookmatch price pipeline.

use anyhow::Context;
use bookmatch::config::{load_config_with_hash, Config};
use bookmatch::crawler::{crawl, plan_sources};
use bookmatch::output::{load_statistics, print_run_summary, print_statistics};
use bookmatch::storage::SqliteStore;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Bookmatch: a multi-storefront book price aggregator
///
/// Bookmatch walks the listings of several book retailers, extracts every
/// product page into a canonical book and price record, and upserts them into
/// a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "bookmatch")]
#[command(version)]
#[command(about = "A multi-storefront book price aggregator", long_about = None)]
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

    /// Only crawl the named source (repeatable)
    #[arg(long = "source", value_name = "NAME")]
    sources: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.sources)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &config_hash, &cli.sources).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bookmatch=info,warn"),
            1 => EnvFilter::new("bookmatch=debug,info"),
            2 => EnvFilter::new("bookmatch=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows each source's plan
fn handle_dry_run(config: &Config, only: &[String]) -> anyhow::Result<()> {
    println!("=== Bookmatch Dry Run ===\n");

    println!("Pipeline:");
    println!("  Commit mode: {}", config.pipeline.commit_mode.as_str());
    println!("  Max fetch retries: {}", config.pipeline.max_fetch_retries);
    println!("  Retry delay: {}ms", config.pipeline.retry_delay_ms);

    println!("\nRenderer:");
    println!("  User agent: {}", config.renderer.user_agent);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.renderer.request_timeout_secs, config.renderer.connect_timeout_secs
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let planned = plan_sources(config, only)?;
    println!("\nSources ({}):", planned.len());
    for (_, plan) in &planned {
        println!("  - {} ({})", plan.source, plan.retailer);
        println!("    * listing: {}", plan.listing_template);
        println!(
            "    * first page {}, cap {} items",
            plan.first_page, plan.max_items
        );
        println!(
            "    * settle {}ms listing, {}ms detail",
            plan.listing_settle.as_millis(),
            plan.detail_settle.as_millis()
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} sources", planned.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = SqliteStore::open(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, only: &[String]) -> anyhow::Result<()> {
    if !only.is_empty() {
        tracing::info!("Restricting run to: {}", only.join(", "));
    }

    match crawl(config, config_hash, only).await {
        Ok(summary) => {
            print_run_summary(&summary);
            if summary.failed.is_empty() {
                tracing::info!("Run completed successfully");
                Ok(())
            } else {
                anyhow::bail!("{} source workers failed", summary.failed.len())
            }
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
