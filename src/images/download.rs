//! Bounded bulk fetch of the selected images
//!
//! Every selected image that has not failed is fetched with at most
//! `concurrency` requests in flight. Failures are flagged in the registry and
//! retried through the registry's retry policy until they succeed or run out
//! of retries.

use super::ImageRegistry;
use crate::crawler::{FetchError, ImageFetcher};
use futures::stream::{self, StreamExt};
use url::Url;

/// One successfully fetched image
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Registry URL of the image
    pub url: String,

    pub filename: String,

    pub content_type: String,

    pub bytes: Vec<u8>,
}

/// Outcome of a bulk fetch
#[derive(Debug, Clone, Default)]
pub struct ImageFetchReport {
    pub fetched: Vec<FetchedImage>,

    /// URLs that are still failed after all retries
    pub failed: Vec<String>,

    /// Number of retry attempts issued
    pub retries: usize,
}

impl ImageFetchReport {
    pub fn total_bytes(&self) -> usize {
        self.fetched.iter().map(|image| image.bytes.len()).sum()
    }
}

/// Fetches every selected, not-failed image in the registry
///
/// # Arguments
///
/// * `fetcher` - The image-fetch collaborator
/// * `registry` - The session's image registry; failure and retry state is updated in place
/// * `concurrency` - Maximum number of fetches in flight (at least 1)
pub async fn fetch_selected<F: ImageFetcher>(
    fetcher: &F,
    registry: &mut ImageRegistry,
    concurrency: usize,
) -> ImageFetchReport {
    let mut report = ImageFetchReport::default();
    let mut pending: Vec<String> = registry
        .selected()
        .filter(|record| !record.load_failed)
        .map(|record| record.url.clone())
        .collect();

    tracing::info!(
        "Fetching {} selected images ({} at a time)",
        pending.len(),
        concurrency.max(1)
    );

    while !pending.is_empty() {
        let results: Vec<(String, Result<_, FetchError>)> = stream::iter(pending.drain(..))
            .map(|url| async move {
                let result = match Url::parse(&url) {
                    Ok(parsed) => fetcher.fetch_image_bytes(&parsed).await,
                    Err(e) => Err(FetchError::Transport {
                        url: url.clone(),
                        message: e.to_string(),
                    }),
                };
                (url, result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        for (url, result) in results {
            match result {
                Ok(image) => {
                    let filename = registry
                        .get(&url)
                        .map(|r| r.filename.clone())
                        .unwrap_or_default();
                    report.fetched.push(FetchedImage {
                        url,
                        filename,
                        content_type: image.content_type,
                        bytes: image.bytes,
                    });
                }
                Err(e) => {
                    tracing::warn!("Image {} failed to load: {}", url, e);
                    if let Err(e) = registry.mark_load_failed(&url) {
                        tracing::error!("{}", e);
                        continue;
                    }

                    match registry.retry(&url) {
                        Ok(attempt) => {
                            tracing::debug!("Retrying image {} (attempt {})", url, attempt);
                            report.retries += 1;
                            pending.push(url);
                        }
                        Err(e) => {
                            tracing::warn!("Giving up on image: {}", e);
                            report.failed.push(url);
                        }
                    }
                }
            }
        }
    }

    report
}
