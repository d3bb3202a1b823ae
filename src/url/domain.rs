use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use craft_spider::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the crawl boundary for a URL: its lowercase host without `www.`
///
/// Two URLs belong to the same site exactly when their registrable domains
/// are equal, so `www.example.com` and `example.com` share a boundary while
/// `other.example.com` does not.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use craft_spider::url::registrable_domain;
///
/// let url = Url::parse("https://www.example.com/a").unwrap();
/// assert_eq!(registrable_domain(&url), Some("example.com".to_string()));
/// ```
pub fn registrable_domain(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| match host.strip_prefix("www.") {
        Some(bare) if !bare.is_empty() => bare.to_string(),
        _ => host,
    })
}

/// Checks whether `url` falls inside the crawl boundary `domain`
pub fn is_same_domain(url: &Url, domain: &str) -> bool {
    registrable_domain(url).is_some_and(|d| d == domain)
}
