use serde::Deserialize;
use std::time::Duration;

/// Browser-like User-Agent presented by the page and image fetchers
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Main configuration structure for Image-Trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seed URL used when none is given on the command line
    #[serde(default)]
    pub seed: Option<String>,
    pub crawler: CrawlSettings,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings for one crawl session
///
/// Read once when a session starts and never changed while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlSettings {
    /// Maximum link-hop distance from the seed (the seed is depth 1)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages fetched in one session
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Follow links that leave the seed's domain
    #[serde(rename = "include-external-domains")]
    pub include_external_domains: bool,

    /// Pause between two page fetches (milliseconds)
    #[serde(rename = "delay-between-requests-ms")]
    pub delay_between_requests_ms: u64,

    /// Keep SVG images in the registry
    #[serde(rename = "include-svg-images")]
    pub include_svg_images: bool,

    /// How many times a failed image may be retried
    #[serde(rename = "max-image-retries")]
    pub max_image_retries: u32,

    /// How long an empty frontier is given to refill before the crawl completes
    #[serde(rename = "settle-window-ms", default = "default_settle_window_ms")]
    pub settle_window_ms: u64,
}

impl CrawlSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 50,
            include_external_domains: false,
            delay_between_requests_ms: 500,
            include_svg_images: true,
            max_image_retries: 2,
            settle_window_ms: default_settle_window_ms(),
        }
    }
}

/// Page and image fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single page request (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Timeout for a single image request attempt (seconds)
    #[serde(rename = "image-timeout-secs", default = "default_image_timeout_secs")]
    pub image_timeout_secs: u64,

    /// Automatic retries for one image URL after the first attempt
    #[serde(rename = "image-retries", default = "default_image_retries")]
    pub image_retries: u32,

    /// Base delay of the exponential backoff between image retries (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum number of image fetches in flight at once
    #[serde(
        rename = "download-concurrency",
        default = "default_download_concurrency"
    )]
    pub download_concurrency: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            page_timeout_secs: default_page_timeout_secs(),
            image_timeout_secs: default_image_timeout_secs(),
            image_retries: default_image_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            download_concurrency: default_download_concurrency(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the markdown report file
    #[serde(rename = "summary-path", default = "default_summary_path")]
    pub summary_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            summary_path: default_summary_path(),
        }
    }
}

fn default_settle_window_ms() -> u64 {
    250
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_image_timeout_secs() -> u64 {
    15
}

fn default_image_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_download_concurrency() -> usize {
    4
}

fn default_summary_path() -> String {
    "./image-report.md".to_string()
}
