//! Scheme-Scrape main entry point
//!
//! This is the command-line interface for running scrape jobs.

use anyhow::Context;
use clap::Parser;
use scheme_scrape::config::{load_config_with_hash, load_job, ScrapeJob, ScraperConfig};
use scheme_scrape::output::write_result;
use scheme_scrape::scrape::run_job;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scheme-Scrape: declarative HTML extraction
///
/// Fetches the page named by a JSON job file (through a response cache
/// when one is configured) and prints the data extracted by the job's
/// scheme as JSON.
#[derive(Parser, Debug)]
#[command(name = "scheme-scrape")]
#[command(version)]
#[command(about = "Declarative HTML extraction over a cached fetcher", long_about = None)]
struct Cli {
    /// Path to JSON scrape job file
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Print the raw result without shrinking it
    #[arg(long)]
    raw: bool,

    /// Write the result to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Validate config and job and show what would be scraped
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => ScraperConfig::default(),
    };

    let job = load_job(&cli.job)
        .with_context(|| format!("Failed to load job {}", cli.job.display()))?;

    if cli.dry_run {
        handle_dry_run(&config, &job);
        return Ok(());
    }

    let result = run_job(&config, job, !cli.raw).await?;
    write_result(&result, cli.output.as_deref()).context("Failed to write result")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scheme_scrape=info,warn"),
            1 => EnvFilter::new("scheme_scrape=debug,info"),
            2 => EnvFilter::new("scheme_scrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the effective settings and the job
fn handle_dry_run(config: &ScraperConfig, job: &ScrapeJob) {
    println!("=== Scheme-Scrape Dry Run ===\n");

    println!("Cache:");
    match job.cache_directory.as_ref().or(config.cache.directory.as_ref()) {
        Some(directory) => println!("  Directory: {}", directory.display()),
        None => println!("  Directory: (disabled)"),
    }
    match job.cache_time {
        Some(time) => println!("  Time: {}s (from job)", time.as_secs_f64()),
        None => println!("  Time: {}s", config.cache.time),
    }
    println!("  Conditional requests: {}", config.cache.use_advanced);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Follow redirects: {}", config.http.handle_redirect);
    println!("  Max redirects: {}", config.http.max_redirects);

    let markdown = job.markdown_config(&config.markdown);
    println!("\nhtml2text:");
    println!("  Width: {}", markdown.width);
    if let Some(max) = markdown.max_wrap_width {
        println!("  Max wrap width: {}", max);
    }
    println!("  Table borders: {}", markdown.table_borders);

    println!("\nJob:");
    println!("  URL: {}", job.url);
    match job.timeout {
        Some(timeout) => println!("  Timeout: {:.1}s", timeout.as_secs_f64()),
        None => println!("  Timeout: (client default)"),
    }
    println!("  Scheme fields: {}", job.scheme.field_names().join(", "));

    println!("\n✓ Configuration and job are valid");
}
