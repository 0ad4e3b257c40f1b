//! Image-Trawler main entry point
//!
//! This is the command-line interface for the Image-Trawler image crawler.

use anyhow::Context;
use clap::Parser;
use image_trawler::config::{
    load_config_with_hash, validate, Config, CrawlSettings, FetcherConfig, OutputConfig,
};
use image_trawler::crawler::{CrawlScheduler, HttpFetcher};
use image_trawler::images::{fetch_selected, ImageType};
use image_trawler::output::{generate_markdown_report, print_summary, SessionSummary};
use image_trawler::CrawlStatus;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Image-Trawler: a polite single-session image crawler
///
/// Image-Trawler crawls a website breadth-first from a seed URL, bounded by
/// depth and page count, and reports every image the visited pages reference.
#[derive(Parser, Debug)]
#[command(name = "image-trawler")]
#[command(version)]
#[command(about = "A polite single-session image crawler", long_about = None)]
struct Cli {
    /// Seed URL (overrides `seed` from the configuration file)
    #[arg(value_name = "SEED")]
    seed: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum link depth from the seed (the seed is depth 1)
    #[arg(long)]
    max_depth: Option<u32>,

    /// Maximum number of pages to visit
    #[arg(long)]
    max_pages: Option<u32>,

    /// Delay between page requests in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Follow links to other domains
    #[arg(long)]
    external: bool,

    /// Ignore SVG images
    #[arg(long)]
    no_svg: bool,

    /// Fetch every selected image after the crawl, retrying failures
    #[arg(long)]
    fetch_images: bool,

    /// Only list images of this type (jpeg, png, gif, svg, webp, avif, unknown)
    #[arg(long, value_name = "TYPE")]
    only: Option<ImageType>,

    /// Where to write the Markdown report (overrides the configuration file)
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

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

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (default_config(), None),
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid crawl settings")?;

    let seed = cli
        .seed
        .clone()
        .or_else(|| config.seed.clone())
        .context("No seed URL: pass one on the command line or set `seed` in the config file")?;

    let fetcher = HttpFetcher::new(&config.fetcher).context("Failed to build HTTP client")?;
    let mut scheduler = CrawlScheduler::new(fetcher.clone());
    scheduler
        .start(&seed, &config.crawler)
        .with_context(|| format!("Could not start crawl from {}", seed))?;

    // Ctrl-C stops the crawl cooperatively; results so far are still reported
    let handle = scheduler.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            handle.stop();
        }
    });

    let status = scheduler.run().await.context("Crawl loop failed")?;
    tracing::info!("Crawl finished with status: {}", status);

    if cli.fetch_images {
        let report = fetch_selected(
            &fetcher,
            scheduler.images_mut(),
            config.fetcher.download_concurrency,
        )
        .await;
        tracing::info!(
            "Fetched {} images ({} bytes), {} failed after {} retries",
            report.fetched.len(),
            report.total_bytes(),
            report.failed.len(),
            report.retries
        );
    }

    let summary = SessionSummary::from_session(scheduler.session(), cli.only, config_hash);
    if !cli.quiet {
        print_summary(&summary);
    }

    let report_path = cli
        .report
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.summary_path));
    generate_markdown_report(&summary, &report_path)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    if status == CrawlStatus::Failed {
        anyhow::bail!("Crawl failed; see the errors above");
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("image_trawler=info,warn"),
            1 => EnvFilter::new("image_trawler=debug,info"),
            2 => EnvFilter::new("image_trawler=trace,debug"),
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

fn default_config() -> Config {
    Config {
        seed: None,
        crawler: CrawlSettings::default(),
        fetcher: FetcherConfig::default(),
        output: OutputConfig::default(),
    }
}

/// Applies command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    let crawler = &mut config.crawler;

    if let Some(max_depth) = cli.max_depth {
        crawler.max_depth = max_depth;
    }
    if let Some(max_pages) = cli.max_pages {
        crawler.max_pages = max_pages;
    }
    if let Some(delay_ms) = cli.delay_ms {
        crawler.delay_between_requests_ms = delay_ms;
    }
    if cli.external {
        crawler.include_external_domains = true;
    }
    if cli.no_svg {
        crawler.include_svg_images = false;
    }
}
