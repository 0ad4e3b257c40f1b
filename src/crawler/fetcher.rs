//! HTTP fetcher implementation
//!
//! This module defines the two fetch collaborators the crawl depends on and
//! their `reqwest` implementation:
//! - `PageFetcher`: follows redirects and returns status plus body text
//! - `ImageFetcher`: per-attempt timeout, automatic retries with exponential
//!   backoff, SVG served as text, YouTube thumbnail fallback chain

use crate::config::FetcherConfig;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Hosts serving YouTube video thumbnails
pub const THUMBNAIL_HOSTS: &[&str] = &["img.youtube.com", "i.ytimg.com"];

/// Thumbnail variants, highest resolution first
pub const THUMBNAIL_VARIANTS: &[&str] = &[
    "maxresdefault",
    "hqdefault",
    "mqdefault",
    "sddefault",
    "default",
];

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Errors reported by the fetch collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The HTTP client itself cannot issue requests
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns true if trying the same URL again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Client(_) => false,
        }
    }

    /// Returns true if no further request can succeed with this fetcher
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Client(_))
    }
}

/// A fetched page; non-2xx statuses are reported here rather than as errors
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,

    /// URL after redirects
    pub final_url: Url,

    pub body: String,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Bytes of one image
#[derive(Debug, Clone)]
pub struct ImageBytes {
    /// URL that actually produced the bytes (a fallback variant for thumbnails)
    pub url: Url,

    pub content_type: String,

    pub bytes: Vec<u8>,
}

/// Page-fetch collaborator
pub trait PageFetcher {
    fn fetch_page(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<PageResponse, FetchError>> + Send;
}

/// Image-fetch collaborator
pub trait ImageFetcher {
    fn fetch_image_bytes(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<ImageBytes, FetchError>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed (up to 10 hops) and responses are decompressed
/// transparently.
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.page_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `reqwest`-backed page and image fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    image_timeout: Duration,
    image_retries: u32,
    retry_backoff: Duration,
    thumbnail_hosts: Vec<String>,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            image_timeout: Duration::from_secs(config.image_timeout_secs),
            image_retries: config.image_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            thumbnail_hosts: THUMBNAIL_HOSTS.iter().map(|h| h.to_string()).collect(),
        })
    }

    /// Replaces the hosts that get the thumbnail fallback chain
    pub fn with_thumbnail_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.thumbnail_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Fetches one image URL, retrying transient failures with exponential backoff
    async fn fetch_image_with_retry(&self, url: &Url) -> Result<ImageBytes, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_image_once(url).await {
                Ok(image) => return Ok(image),
                Err(e) if e.is_retryable() && attempt < self.image_retries => {
                    let backoff = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::debug!(
                        "Image fetch attempt {} for {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        url,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_image_once(&self, url: &Url) -> Result<ImageBytes, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.image_timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let is_svg = content_type.contains("svg") || url.path().to_lowercase().ends_with(".svg");

        if is_svg {
            let text = response.text().await.map_err(|e| classify_error(url, e))?;
            return Ok(ImageBytes {
                url: url.clone(),
                content_type: SVG_CONTENT_TYPE.to_string(),
                bytes: text.into_bytes(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| classify_error(url, e))?;
        Ok(ImageBytes {
            url: url.clone(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<PageResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        if final_url != *url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(PageResponse {
            status,
            final_url,
            body,
        })
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch_image_bytes(&self, url: &Url) -> Result<ImageBytes, FetchError> {
        let candidates = thumbnail_fallback_chain(url, &self.thumbnail_hosts);
        let mut last_error = None;

        for candidate in &candidates {
            match self.fetch_image_with_retry(candidate).await {
                Ok(image) => {
                    if candidate != url {
                        tracing::info!("Thumbnail {} served by fallback {}", url, candidate);
                    }
                    return Ok(image);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::debug!("Image {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "no candidate URL".to_string(),
        }))
    }
}

/// Lists the URLs to try for an image, in order
///
/// For a thumbnail URL like `https://img.youtube.com/vi/<id>/<variant>.jpg`
/// the requested URL comes first, followed by every variant of
/// [`THUMBNAIL_VARIANTS`] not yet tried. Any other URL yields just itself.
pub fn thumbnail_fallback_chain(url: &Url, thumbnail_hosts: &[String]) -> Vec<Url> {
    let mut chain = vec![url.clone()];

    let host = match url.host_str() {
        Some(h) => h.to_lowercase(),
        None => return chain,
    };
    if !thumbnail_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
        return chain;
    }

    let segments: Vec<&str> = match url.path_segments() {
        Some(segments) => segments.collect(),
        None => return chain,
    };
    let (prefix, video_id, file) = match segments.as_slice() {
        [prefix, video_id, file] if !video_id.is_empty() => (*prefix, *video_id, *file),
        _ => return chain,
    };
    let extension = match file.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => "jpg",
    };

    for variant in THUMBNAIL_VARIANTS {
        let mut candidate = url.clone();
        candidate.set_path(&format!("/{}/{}/{}.{}", prefix, video_id, variant, extension));
        candidate.set_query(None);
        if !chain.contains(&candidate) {
            chain.push(candidate);
        }
    }

    chain
}

/// Maps a `reqwest` error onto the fetch error taxonomy
fn classify_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_builder() {
        FetchError::Client(e.to_string())
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
