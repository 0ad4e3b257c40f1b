//! Link and image extraction
//!
//! Given a page's markup and URL this module produces:
//! - outbound link candidates from `<a href>` elements
//! - image candidates from `<img>` elements, classified and named
//! - the candidates that failed URL resolution, for the caller to log

use crate::config::CrawlSettings;
use crate::images::{ImageCandidate, ImageType};
use crate::url::{canonical_key, resolve_url, same_domain};
use crate::UrlError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Schemes that never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Which kind of element a rejected candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Link,
    Image,
}

/// A link or image reference that could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub kind: CandidateKind,
    pub raw: String,
    pub error: UrlError,
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// Absolute link targets, one per canonical key, in document order
    pub links: Vec<Url>,

    /// Image candidates, one per image URL, in document order
    pub images: Vec<ImageCandidate>,

    pub rejected: Vec<RejectedCandidate>,

    /// Anchors pointing back at the page itself (including bare `/`)
    pub self_references: usize,
}

/// Extracts link and image candidates from a page
///
/// # Link Rules
///
/// **Skipped:** empty hrefs, fragment-only anchors (`#...`), `javascript:`,
/// `mailto:`, `tel:` and `data:` hrefs, bare `/`, links back to the page
/// itself, and cross-domain links unless `include_external_domains` is set.
/// Duplicate targets are collapsed.
///
/// # Image Rules
///
/// `src` is used, falling back to `data-src` for lazy-loaded images. Empty
/// sources and data URLs are skipped; SVG images are dropped unless
/// `include_svg_images` is set.
///
/// # Example
///
/// ```
/// use image_trawler::config::CrawlSettings;
/// use image_trawler::crawler::extract;
/// use url::Url;
///
/// let html = r#"<a href="/about">About</a><img src="/logo.png" width="64">"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// let extracted = extract(html, &page, &CrawlSettings::default());
/// assert_eq!(extracted.links[0].as_str(), "https://example.com/about");
/// assert_eq!(extracted.images[0].filename, "logo.png");
/// assert_eq!(extracted.images[0].width, Some(64));
/// ```
pub fn extract(markup: &str, page_url: &Url, settings: &CrawlSettings) -> ExtractedPage {
    let document = Html::parse_document(markup);
    let mut extracted = ExtractedPage::default();

    extract_links(&document, page_url, settings, &mut extracted);
    extract_images(&document, page_url, settings, &mut extracted);

    extracted
}

fn extract_links(
    document: &Html,
    page_url: &Url,
    settings: &CrawlSettings,
    extracted: &mut ExtractedPage,
) {
    let Ok(selector) = Selector::parse("a[href]") else {
        return;
    };

    let page_key = canonical_key(page_url);
    let mut seen = HashSet::new();

    for element in document.select(&selector) {
        let href = element.value().attr("href").unwrap_or_default().trim();

        if href.is_empty() || href.starts_with('#') || has_skipped_scheme(href) {
            continue;
        }

        if href == "/" {
            extracted.self_references += 1;
            continue;
        }

        let url = match resolve_url(href, Some(page_url)) {
            Ok(url) => url,
            Err(error) => {
                extracted.rejected.push(RejectedCandidate {
                    kind: CandidateKind::Link,
                    raw: href.to_string(),
                    error,
                });
                continue;
            }
        };

        let key = canonical_key(&url);
        if key == page_key {
            extracted.self_references += 1;
            continue;
        }

        if !settings.include_external_domains && !same_domain(&url, page_url) {
            tracing::trace!("Skipping external link {}", url);
            continue;
        }

        if seen.insert(key) {
            extracted.links.push(url);
        }
    }
}

fn extract_images(
    document: &Html,
    page_url: &Url,
    settings: &CrawlSettings,
    extracted: &mut ExtractedPage,
) {
    let Ok(selector) = Selector::parse("img") else {
        return;
    };

    let mut seen = HashSet::new();

    for element in document.select(&selector) {
        let Some(src) = image_source(&element) else {
            continue;
        };

        let url = match resolve_url(src, Some(page_url)) {
            Ok(url) => url,
            Err(error) => {
                extracted.rejected.push(RejectedCandidate {
                    kind: CandidateKind::Image,
                    raw: src.to_string(),
                    error,
                });
                continue;
            }
        };

        let image_type = ImageType::from_url(&url);
        if image_type == ImageType::Svg && !settings.include_svg_images {
            continue;
        }

        if !seen.insert(url.as_str().to_string()) {
            continue;
        }

        let filename = image_filename(&url, page_url, extracted.images.len());
        extracted.images.push(ImageCandidate {
            filename,
            image_type,
            width: dimension(&element, "width"),
            height: dimension(&element, "height"),
            url,
        });
    }
}

/// Picks the usable source of an `<img>`, skipping empty values and data URLs
fn image_source<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    ["src", "data-src"]
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.to_ascii_lowercase().starts_with("data:"))
}

fn has_skipped_scheme(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Reads a positive pixel dimension such as `300` or `300px`
fn dimension(element: &ElementRef<'_>, attr: &str) -> Option<u32> {
    element
        .value()
        .attr(attr)
        .map(|v| v.trim().trim_end_matches("px"))
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&v| v > 0)
}

/// Derives a file name for an image
///
/// The last path segment is used when it has an extension. Otherwise a name is
/// synthesized from the page URL and the image's ordinal on the page, with a
/// `.jpg` extension that says nothing about the actual format.
fn image_filename(url: &Url, page_url: &Url, index: usize) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    if segment.contains('.') {
        return segment.to_string();
    }

    format!("{}-image-{}.jpg", page_slug(page_url), index + 1)
}

/// Turns a page URL into a filesystem-friendly slug (`example-com-gallery`)
fn page_slug(page_url: &Url) -> String {
    let raw = format!("{}{}", page_url.host_str().unwrap_or("page"), page_url.path());
    let mut slug = String::with_capacity(raw.len());

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.trim_matches('-').to_string()
}
