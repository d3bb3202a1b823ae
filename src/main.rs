//! Craft-Spider main entry point
//!
//! This is the command-line interface for the Craft-Spider site crawler.

use anyhow::{bail, Context};
use clap::Parser;
use craft_spider::config::{load_config_with_hash, resolve_projects, Config};
use craft_spider::crawler::{run_crawl, select_projects, RunOptions};
use craft_spider::output::{
    load_statistics, open_sink, print_statistics, print_summary, ContentSink,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Craft-Spider: a concurrent, resumable site crawler
///
/// Craft-Spider crawls each configured website inside its own domain,
/// stores original and processed page text on disk, forwards documents to
/// a search index, and resumes where it left off on the next run.
#[derive(Parser, Debug)]
#[command(name = "craft-spider")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent, resumable site crawler", long_about = None)]
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

    /// Only run the named project (repeatable)
    #[arg(short, long = "project", value_name = "NAME")]
    projects: Vec<String>,

    /// Discard saved frontiers and start from the homepage
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "cleanup"])]
    dry_run: bool,

    /// Show per-project statistics from disk and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cleanup"])]
    stats: bool,

    /// Remove undersized downloads and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    cleanup: bool,
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
        handle_dry_run(&config, &cli.projects)
    } else if cli.stats {
        handle_stats(&config, &cli.projects)
    } else if cli.cleanup {
        handle_cleanup(&config, &cli.projects)
    } else {
        let options = RunOptions {
            fresh: cli.fresh,
            projects: cli.projects,
        };
        handle_crawl(&config, &options).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("craft_spider=info,warn"),
            1 => EnvFilter::new("craft_spider=debug,info"),
            2 => EnvFilter::new("craft_spider=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, names: &[String]) -> anyhow::Result<()> {
    println!("=== Craft-Spider Dry Run ===\n");

    println!("Fetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!(
        "  Attempts: {} (backoff from {}ms)",
        config.fetcher.max_attempts, config.fetcher.base_delay_ms
    );
    println!("  User agent: {}", config.fetcher.user_agent);

    println!("\nOutput:");
    println!("  Root: {}", config.output.root_dir);
    println!("  Minimum file size: {} bytes", config.output.min_file_size);

    println!("\nIndexer:");
    if config.indexer.enabled {
        println!("  {}/{}", config.indexer.endpoint, config.indexer.index);
    } else {
        println!("  disabled");
    }

    let projects = select_projects(resolve_projects(config)?, names)?;
    println!("\nProjects ({}):", projects.len());
    for project in &projects {
        println!(
            "  - {} [{}] {} (domain {}, {} pages, {} workers)",
            project.name,
            project.language,
            project.base_url,
            project.domain,
            project.max_pages,
            project.threads
        );
        println!("    dir: {}", project.dir.display());
        for seed in &project.seed_urls {
            println!("    * {}", seed);
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from each project's files
fn handle_stats(config: &Config, names: &[String]) -> anyhow::Result<()> {
    for project in select_projects(resolve_projects(config)?, names)? {
        let stats = load_statistics(&project, config.output.min_file_size)
            .with_context(|| format!("Failed to read state of project {}", project.name))?;
        print_statistics(&stats);
    }
    Ok(())
}

/// Handles the --cleanup mode: removes undersized downloads
fn handle_cleanup(config: &Config, names: &[String]) -> anyhow::Result<()> {
    for project in select_projects(resolve_projects(config)?, names)? {
        let removed = open_sink(&project, config.output.min_file_size)
            .clean_small_files()
            .with_context(|| format!("Failed to clean project {}", project.name))?;
        println!("{}: removed {} file(s)", project.name, removed);
    }
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, options: &RunOptions) -> anyhow::Result<()> {
    if options.fresh {
        tracing::info!("Starting fresh crawl (ignoring saved frontiers)");
    } else {
        tracing::info!("Starting crawl (resuming saved frontiers)");
    }

    let report = run_crawl(config, options).await?;

    for summary in &report.summaries {
        print_summary(summary);
    }

    if !report.failures.is_empty() {
        for (name, error) in &report.failures {
            tracing::error!("[{}] {}", name, error);
        }
        bail!("{} project(s) failed", report.failures.len());
    }

    tracing::info!("Crawl completed successfully");
    Ok(())
}
