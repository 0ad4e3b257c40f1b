use crate::UrlError;
use url::Url;

/// Resolves a raw URL against an optional base and validates it
///
/// Relative (`page.html`, `../img/a.png`), protocol-relative
/// (`//cdn.example.com/a.png`) and absolute forms are accepted. The fragment
/// is always dropped; everything else is kept as written, so the result is
/// the address to fetch.
///
/// # Arguments
///
/// * `raw` - The URL as it appeared in the markup or on the command line
/// * `base` - The URL of the page the reference was found on, if any
///
/// # Returns
///
/// * `Ok(Url)` - Absolute HTTP(S) URL without fragment
/// * `Err(UrlError)` - Empty, unparsable, non-HTTP(S), or host-less input
pub fn resolve_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    let mut url = parsed.map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    url.set_fragment(None);
    Ok(url)
}

/// Normalizes a URL to its canonical frontier key
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` (see [`resolve_url`]); reject if malformed
/// 2. Keep scheme and lowercase host (plus port when it is not the default)
/// 3. Lowercase the path and strip trailing slashes
/// 4. Keep the query string as written
/// 5. Drop the fragment
///
/// The key is itself a parsable URL and normalizing it again yields the
/// same key.
///
/// # Examples
///
/// ```
/// use image_trawler::url::normalize_url;
///
/// let key = normalize_url("HTTPS://Example.COM/Gallery/?page=2#top", None).unwrap();
/// assert_eq!(key, "https://example.com/gallery?page=2");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<String, UrlError> {
    let url = resolve_url(raw, base)?;
    Ok(canonical_key(&url))
}

/// Builds the canonical key of an already resolved URL
pub fn canonical_key(url: &Url) -> String {
    let mut key = String::with_capacity(url.as_str().len());
    key.push_str(url.scheme());
    key.push_str("://");
    key.push_str(&url.host_str().unwrap_or_default().to_lowercase());

    // port() is None for the scheme's default port
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }

    let path = url.path().to_lowercase();
    key.push_str(path.trim_end_matches('/'));

    if let Some(query) = url.query() {
        if !query.is_empty() {
            key.push('?');
            key.push_str(query);
        }
    }

    key
}
