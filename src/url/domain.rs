use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host, or `None` when the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use image_trawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when two URLs belong to the same site
///
/// Hosts are compared case-insensitively and a leading `www.` is ignored on
/// either side. Ports and schemes are not compared.
pub fn same_domain(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => strip_www(&a) == strip_www(&b),
        _ => false,
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
