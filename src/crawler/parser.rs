//! HTML parser for extracting links
//!
//! This module handles parsing HTML content to extract the links to follow
//! (from `<a>` tags), honoring `<base href>`.
//!
//! Parsing never fails: html5ever recovers from any malformed markup, so
//! a broken page simply yields fewer links.

use crate::config::Project;
use crate::url::{is_same_domain, normalize_url, registrable_domain};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// All links found on the page (absolute URLs, document order)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// Relative links resolve against `<base href>` when the document has one,
/// otherwise against `page_url`.
///
/// # Example
///
/// ```
/// use craft_spider::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &page_url);
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, page_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let base = document_base(&document, page_url);
    let links = extract_anchor_links(&document, &base);

    ParsedPage { links }
}

/// The URL relative links resolve against
fn document_base(document: &Html, page_url: &Url) -> Url {
    let Ok(base_selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };

    document
        .select(&base_selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

fn extract_anchor_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Link discovery for one project
///
/// Turns a fetched page into the set of normalized, same-domain URLs it
/// links to.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    base_url: Url,
    domain: String,
}

impl LinkExtractor {
    /// Creates an extractor bounded to the domain of `base_url`
    pub fn new(base_url: Url) -> Self {
        let domain = registrable_domain(&base_url).unwrap_or_default();
        Self { base_url, domain }
    }

    pub fn for_project(project: &Project) -> Self {
        Self {
            base_url: project.base_url.clone(),
            domain: project.domain.clone(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Extracts the same-domain links of a page
    ///
    /// # Arguments
    ///
    /// * `page_url` - The URL the markup was served from
    /// * `html` - Page markup, possibly malformed
    pub fn extract(&self, page_url: &Url, html: &str) -> HashSet<String> {
        self.filter(parse_html(html, page_url).links)
    }

    /// Normalizes candidate links and keeps those inside the domain
    pub fn filter(&self, links: impl IntoIterator<Item = String>) -> HashSet<String> {
        links
            .into_iter()
            .filter_map(|link| normalize_url(&link).ok())
            .filter(|url| is_same_domain(url, &self.domain))
            .map(|url| url.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn extractor() -> LinkExtractor {
        LinkExtractor::new(Url::parse("https://www.example.com/").unwrap())
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<html><body><a href="https://other.com/page">Link</a></body></html>"#;
        let parsed = parse_html(html, &page_url());
        assert_eq!(parsed.links, vec!["https://other.com/page".to_string()]);
    }

    #[test]
    fn test_extract_relative_path_link() {
        let html = r#"<html><body><a href="other">Link</a><a href="/root">Root</a></body></html>"#;
        let parsed = parse_html(html, &page_url());
        assert_eq!(
            parsed.links,
            vec![
                "https://example.com/other".to_string(),
                "https://example.com/root".to_string()
            ]
        );
    }

    #[test]
    fn test_base_href_used_for_resolution() {
        let html = r#"<html><head><base href="https://example.com/docs/"></head>
            <body><a href="intro">Intro</a></body></html>"#;
        let parsed = parse_html(html, &page_url());
        assert_eq!(parsed.links, vec!["https://example.com/docs/intro".to_string()]);
    }

    #[test]
    fn test_skip_non_navigational_links() {
        let html = r##"<html><body>
            <a href="javascript:void(0)">js</a>
            <a href="JavaScript:alert(1)">js</a>
            <a href="mailto:test@example.com">mail</a>
            <a href="tel:+1234567890">call</a>
            <a href="data:text/html,<h1>Test</h1>">data</a>
            <a href="#section">jump</a>
            <a href="/file.pdf" download>download</a>
            <a href="">empty</a>
            <a href="/valid">valid</a>
        </body></html>"##;
        let parsed = parse_html(html, &page_url());
        assert_eq!(parsed.links, vec!["https://example.com/valid".to_string()]);
    }

    #[test]
    fn test_follow_nofollow_links() {
        let html = r#"<html><body><a href="/page" rel="nofollow">Link</a></body></html>"#;
        assert_eq!(parse_html(html, &page_url()).links.len(), 1);
    }

    #[test]
    fn test_malformed_markup_is_tolerated() {
        let html = r#"<html><body><div><a href="/one">one<p><a href="/two">two</div></span><a href="/three""#;
        let links = extractor().extract(&page_url(), html);
        assert!(links.contains("https://example.com/one"));
        assert!(links.contains("https://example.com/two"));
    }

    #[test]
    fn test_extract_keeps_only_same_domain() {
        let html = r#"<html><body>
            <a href="/a">a</a>
            <a href="https://www.example.com/b">b</a>
            <a href="https://other.example.com/c">c</a>
            <a href="https://elsewhere.org/d">d</a>
        </body></html>"#;
        let links = extractor().extract(&page_url(), html);

        let expected: HashSet<String> = [
            "https://example.com/a".to_string(),
            "https://www.example.com/b".to_string(),
        ]
        .into_iter()
        .collect();
        assert_eq!(links, expected);
    }

    #[test]
    fn test_extract_normalizes_and_dedupes() {
        let html = r#"<html><body>
            <a href="/a#top">a</a>
            <a href="/a">a</a>
            <a href="/a?utm_source=x">a</a>
        </body></html>"#;
        let links = extractor().extract(&page_url(), html);
        assert_eq!(links.len(), 1);
        assert!(links.contains("https://example.com/a"));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let html = r#"<a href="/x">x</a><a href="../y/./z">z</a>"#;
        let first = extractor().extract(&page_url(), html);
        let second = extractor().extract(&page_url(), html);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_page() {
        assert!(extractor().extract(&page_url(), "").is_empty());
    }
}
