//! Image registry module
//!
//! This module owns everything the crawl learns about images:
//! - `ImageType` classification by file extension
//! - `ImageCandidate`, the extractor's per-page output
//! - `ImageRegistry`, the deduplicated per-session collection with
//!   selection and failed-load retry state
//! - bounded bulk fetching of the selected images

mod download;
mod registry;

pub use download::{fetch_selected, FetchedImage, ImageFetchReport};
pub use registry::{ImageRecord, ImageRegistry, RegistryError};

use std::fmt;
use std::str::FromStr;
use url::Url;

/// Image format inferred from the file extension of the image URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageType {
    Jpeg,
    Png,
    Gif,
    Svg,
    Webp,
    Avif,
    Unknown,
}

impl ImageType {
    /// Every variant, in report order
    pub const ALL: [ImageType; 7] = [
        Self::Jpeg,
        Self::Png,
        Self::Gif,
        Self::Svg,
        Self::Webp,
        Self::Avif,
        Self::Unknown,
    ];

    /// Classifies a bare file extension (without the dot, any case)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "svg" => Self::Svg,
            "webp" => Self::Webp,
            "avif" => Self::Avif,
            _ => Self::Unknown,
        }
    }

    /// Classifies an image URL by the extension of its last path segment
    ///
    /// The query string never takes part in classification.
    pub fn from_url(url: &Url) -> Self {
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();

        match segment.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Svg => "svg",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "svg" => Ok(Self::Svg),
            "webp" => Ok(Self::Webp),
            "avif" => Ok(Self::Avif),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown image type '{}'", other)),
        }
    }
}

/// An image reference found on a page, before deduplication
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    /// Absolute image URL, fragment removed
    pub url: Url,

    /// File name derived from the URL (or synthesized from the page)
    pub filename: String,

    pub image_type: ImageType,

    /// Declared width from the element, when present and non-zero
    pub width: Option<u32>,

    /// Declared height from the element, when present and non-zero
    pub height: Option<u32>,
}
