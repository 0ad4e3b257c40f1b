use crate::config::types::{Config, CrawlSettings, FetcherConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

const MAX_DEPTH_LIMIT: u32 = 20;
const MAX_PAGES_LIMIT: u32 = 10_000;
const MAX_DELAY_MS: u64 = 60_000;
const MAX_SETTLE_WINDOW_MS: u64 = 10_000;
const MAX_IMAGE_RETRIES_LIMIT: u32 = 10;
const MAX_FETCH_RETRIES: u32 = 5;
const MAX_RETRY_BACKOFF_MS: u64 = 10_000;
const MAX_DOWNLOAD_CONCURRENCY: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if let Some(seed) = &config.seed {
        validate_seed(seed)?;
    }
    validate_settings(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl settings
///
/// Out-of-range values are rejected, never clamped.
pub fn validate_settings(settings: &CrawlSettings) -> Result<(), ConfigError> {
    if settings.max_depth < 1 || settings.max_depth > MAX_DEPTH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_depth must be between 1 and {}, got {}",
            MAX_DEPTH_LIMIT, settings.max_depth
        )));
    }

    if settings.max_pages < 1 || settings.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, settings.max_pages
        )));
    }

    if settings.delay_between_requests_ms > MAX_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "delay_between_requests_ms must be <= {}ms, got {}ms",
            MAX_DELAY_MS, settings.delay_between_requests_ms
        )));
    }

    if settings.settle_window_ms > MAX_SETTLE_WINDOW_MS {
        return Err(ConfigError::Validation(format!(
            "settle_window_ms must be <= {}ms, got {}ms",
            MAX_SETTLE_WINDOW_MS, settings.settle_window_ms
        )));
    }

    if settings.max_image_retries > MAX_IMAGE_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_image_retries must be <= {}, got {}",
            MAX_IMAGE_RETRIES_LIMIT, settings.max_image_retries
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "page_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.image_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "image_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.image_retries > MAX_FETCH_RETRIES {
        return Err(ConfigError::Validation(format!(
            "image_retries must be <= {}, got {}",
            MAX_FETCH_RETRIES, config.image_retries
        )));
    }

    if config.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
        return Err(ConfigError::Validation(format!(
            "retry_backoff_ms must be <= {}, got {}",
            MAX_RETRY_BACKOFF_MS, config.retry_backoff_ms
        )));
    }

    if config.download_concurrency < 1 || config.download_concurrency > MAX_DOWNLOAD_CONCURRENCY
    {
        return Err(ConfigError::Validation(format!(
            "download_concurrency must be between 1 and {}, got {}",
            MAX_DOWNLOAD_CONCURRENCY, config.download_concurrency
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a configured seed URL
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::Validation(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    Ok(())
}
