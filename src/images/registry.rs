//! Deduplicated image collection for one crawl session

use super::{ImageCandidate, ImageType};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors returned by registry mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("No image registered for {0}")]
    UnknownImage(String),

    #[error("Image {0} has not failed to load")]
    NotFailed(String),

    #[error("Image {url} already retried {attempts} times")]
    RetriesExhausted { url: String, attempts: u32 },
}

/// One deduplicated image discovered during a session
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Absolute image URL; unique within the registry
    pub url: String,

    pub filename: String,

    /// Page the image was first seen on
    pub source_url: String,

    pub selected: bool,

    pub image_type: ImageType,

    pub width: Option<u32>,

    pub height: Option<u32>,

    pub load_failed: bool,

    pub retry_count: u32,
}

impl ImageRecord {
    fn from_candidate(candidate: ImageCandidate, source_url: &str) -> Self {
        Self {
            url: candidate.url.to_string(),
            filename: candidate.filename,
            source_url: source_url.to_string(),
            selected: true,
            image_type: candidate.image_type,
            width: candidate.width,
            height: candidate.height,
            load_failed: false,
            retry_count: 0,
        }
    }
}

/// The session's image collection
///
/// Records keep their registration order. A URL is registered at most once;
/// later sightings of the same URL are ignored, so `source_url` always names
/// the first page that referenced it.
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    records: Vec<ImageRecord>,
    index: HashMap<String, usize>,
    max_retries: u32,
}

impl ImageRegistry {
    pub fn new(max_retries: u32) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            max_retries,
        }
    }

    /// Adds every candidate whose URL is not yet registered
    ///
    /// Returns the number of new records.
    pub fn register(
        &mut self,
        candidates: impl IntoIterator<Item = ImageCandidate>,
        source_url: &str,
    ) -> usize {
        let before = self.records.len();

        for candidate in candidates {
            let key = candidate.url.as_str();
            if self.index.contains_key(key) {
                tracing::trace!("Image already registered: {}", key);
                continue;
            }

            let record = ImageRecord::from_candidate(candidate, source_url);
            self.index.insert(record.url.clone(), self.records.len());
            self.records.push(record);
        }

        self.records.len() - before
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// All records in registration order
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, url: &str) -> Option<&ImageRecord> {
        self.index.get(url).map(|&i| &self.records[i])
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    fn get_mut(&mut self, url: &str) -> Result<&mut ImageRecord, RegistryError> {
        match self.index.get(url) {
            Some(&i) => Ok(&mut self.records[i]),
            None => Err(RegistryError::UnknownImage(url.to_string())),
        }
    }

    pub fn set_selected(&mut self, url: &str, selected: bool) -> Result<(), RegistryError> {
        self.get_mut(url)?.selected = selected;
        Ok(())
    }

    pub fn select_all(&mut self, selected: bool) {
        for record in &mut self.records {
            record.selected = selected;
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter().filter(|r| r.selected)
    }

    /// Records of the given type, or every record for `None`
    ///
    /// This is a view; the registry is not modified.
    pub fn filter_by_type(&self, image_type: Option<ImageType>) -> Vec<&ImageRecord> {
        self.records
            .iter()
            .filter(|r| image_type.map_or(true, |t| r.image_type == t))
            .collect()
    }

    /// Number of records per image type
    pub fn counts_by_type(&self) -> BTreeMap<ImageType, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.image_type).or_insert(0) += 1;
        }
        counts
    }

    pub fn mark_load_failed(&mut self, url: &str) -> Result<(), RegistryError> {
        self.get_mut(url)?.load_failed = true;
        Ok(())
    }

    /// Returns true if the record has failed and still has retries left
    pub fn can_retry(&self, url: &str) -> bool {
        self.get(url)
            .map(|r| r.load_failed && r.retry_count < self.max_retries)
            .unwrap_or(false)
    }

    /// Clears the failure flag of a failed record and counts the attempt
    ///
    /// Once `retry_count` reaches the session's `max_image_retries` the record
    /// stays failed for good.
    ///
    /// # Returns
    ///
    /// * `Ok(u32)` - The new retry count
    /// * `Err(RegistryError)` - Unknown URL, record not failed, or retries used up
    pub fn retry(&mut self, url: &str) -> Result<u32, RegistryError> {
        let max_retries = self.max_retries;
        let record = self.get_mut(url)?;

        if !record.load_failed {
            return Err(RegistryError::NotFailed(url.to_string()));
        }

        if record.retry_count >= max_retries {
            return Err(RegistryError::RetriesExhausted {
                url: url.to_string(),
                attempts: record.retry_count,
            });
        }

        record.retry_count += 1;
        record.load_failed = false;
        Ok(record.retry_count)
    }

    /// Records whose last load failed
    pub fn failed(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter().filter(|r| r.load_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn candidate(url: &str) -> ImageCandidate {
        let url = Url::parse(url).unwrap();
        ImageCandidate {
            filename: url.path_segments().unwrap().last().unwrap().to_string(),
            image_type: ImageType::from_url(&url),
            url,
            width: None,
            height: None,
        }
    }

    #[test]
    fn test_register_deduplicates() {
        let mut registry = ImageRegistry::new(2);

        let added = registry.register(
            vec![
                candidate("https://example.com/a.png"),
                candidate("https://example.com/b.jpg"),
                candidate("https://example.com/a.png"),
            ],
            "https://example.com/",
        );
        assert_eq!(added, 2);

        let added = registry.register(
            vec![candidate("https://example.com/a.png")],
            "https://example.com/other",
        );
        assert_eq!(added, 0);
        assert_eq!(registry.len(), 2);

        let record = registry.get("https://example.com/a.png").unwrap();
        assert_eq!(record.source_url, "https://example.com/");
        assert!(record.selected);
        assert!(!record.load_failed);
        assert_eq!(record.retry_count, 0);
    }

    #[test]
    fn test_selection() {
        let mut registry = ImageRegistry::new(0);
        registry.register(
            vec![
                candidate("https://example.com/a.png"),
                candidate("https://example.com/b.png"),
            ],
            "https://example.com/",
        );

        registry
            .set_selected("https://example.com/a.png", false)
            .unwrap();
        assert_eq!(registry.selected().count(), 1);

        registry.select_all(false);
        assert_eq!(registry.selected().count(), 0);

        registry.select_all(true);
        assert_eq!(registry.selected().count(), 2);

        assert_eq!(
            registry.set_selected("https://example.com/missing.png", true),
            Err(RegistryError::UnknownImage(
                "https://example.com/missing.png".to_string()
            ))
        );
    }

    #[test]
    fn test_filter_by_type_is_a_view() {
        let mut registry = ImageRegistry::new(0);
        registry.register(
            vec![
                candidate("https://example.com/a.png"),
                candidate("https://example.com/b.jpg"),
                candidate("https://example.com/c.png"),
            ],
            "https://example.com/",
        );

        let pngs = registry.filter_by_type(Some(ImageType::Png));
        assert_eq!(pngs.len(), 2);
        assert!(pngs.iter().all(|r| r.image_type == ImageType::Png));

        assert_eq!(registry.filter_by_type(None).len(), 3);
        assert!(registry.filter_by_type(Some(ImageType::Gif)).is_empty());
        assert_eq!(registry.len(), 3);

        let counts = registry.counts_by_type();
        assert_eq!(counts.get(&ImageType::Png), Some(&2));
        assert_eq!(counts.get(&ImageType::Jpeg), Some(&1));
    }

    #[test]
    fn test_retry_policy() {
        let url = "https://example.com/a.png";
        let mut registry = ImageRegistry::new(2);
        registry.register(vec![candidate(url)], "https://example.com/");

        assert_eq!(
            registry.retry(url),
            Err(RegistryError::NotFailed(url.to_string()))
        );

        registry.mark_load_failed(url).unwrap();
        assert!(registry.can_retry(url));
        assert_eq!(registry.retry(url), Ok(1));
        assert!(!registry.get(url).unwrap().load_failed);

        registry.mark_load_failed(url).unwrap();
        assert_eq!(registry.retry(url), Ok(2));

        registry.mark_load_failed(url).unwrap();
        assert!(!registry.can_retry(url));
        assert_eq!(
            registry.retry(url),
            Err(RegistryError::RetriesExhausted {
                url: url.to_string(),
                attempts: 2
            })
        );

        let record = registry.get(url).unwrap();
        assert!(record.load_failed);
        assert_eq!(record.retry_count, 2);
        assert_eq!(registry.failed().count(), 1);
    }

    #[test]
    fn test_zero_retries_fails_permanently() {
        let url = "https://example.com/a.png";
        let mut registry = ImageRegistry::new(0);
        registry.register(vec![candidate(url)], "https://example.com/");

        registry.mark_load_failed(url).unwrap();
        assert!(matches!(
            registry.retry(url),
            Err(RegistryError::RetriesExhausted { attempts: 0, .. })
        ));
    }
}
