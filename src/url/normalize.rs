use crate::UrlError;
use url::Url;

/// Query parameters that only carry click tracking
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a URL into its frontier form
///
/// Two spellings of the same page must collapse to one frontier entry, but
/// the normalized URL is also what gets fetched, so nothing that could change
/// the server's answer is rewritten (scheme, `www.`, trailing slash and
/// ordinary query parameters are kept byte for byte).
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Lowercase the host (done by the parser)
/// 4. Collapse duplicate slashes and dot segments in the path
/// 5. Remove the fragment
/// 6. Remove `utm_*` and click-id tracking parameters, dropping an empty `?`
///
/// # Examples
///
/// ```
/// use craft_spider::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com//docs/./intro/#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/intro/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    let stripped = url.query().and_then(strip_tracking_params);
    if let Some(query) = stripped {
        url.set_query((!query.is_empty()).then_some(query.as_str()));
    }

    Ok(url)
}

/// Drops tracking segments from a raw query string
///
/// Returns `None` when there is nothing to drop. Kept segments are not
/// decoded or re-encoded.
fn strip_tracking_params(query: &str) -> Option<String> {
    let segments: Vec<&str> = query.split('&').collect();
    let kept: Vec<&str> = segments
        .iter()
        .copied()
        .filter(|segment| {
            let key = segment.split_once('=').map_or(*segment, |(key, _)| key);
            !is_tracking_param(key)
        })
        .collect();

    (kept.len() != segments.len()).then(|| kept.join("&"))
}

/// Collapses empty and dot segments while keeping a trailing slash
fn normalize_path(path: &str) -> String {
    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_is_preserved() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_www_is_preserved() {
        let result = normalize_url("https://www.example.com/").unwrap();
        assert_eq!(result.as_str(), "https://www.example.com/");
    }

    #[test]
    fn test_trailing_slash_is_preserved() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result =
            normalize_url("https://example.com/page?utm_source=twitter&fbclid=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_other_params_in_order() {
        let result =
            normalize_url("https://example.com/list?page=2&utm_medium=mail&sort=new").unwrap();
        assert_eq!(result.as_str(), "https://example.com/list?page=2&sort=new");
    }

    #[test]
    fn test_valueless_param_is_untouched() {
        let result = normalize_url("https://example.com/list?page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/list?page");
    }

    #[test]
    fn test_encoded_values_are_not_reencoded() {
        let result = normalize_url("https://example.com/search?q=a%20b&lang=zh").unwrap();
        assert_eq!(result.as_str(), "https://example.com/search?q=a%20b&lang=zh");
    }

    #[test]
    fn test_slashes_in_values_survive_tracking_removal() {
        let result = normalize_url("https://example.com/go?path=/x/y&utm_source=z").unwrap();
        assert_eq!(result.as_str(), "https://example.com/go?path=/x/y");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://example.com///path//to///page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/page");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_lowercase_domain_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }
}
