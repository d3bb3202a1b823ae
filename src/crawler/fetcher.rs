//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients that present browser-like headers
//! - GET requests with a per-request origin referer
//! - Bounded retry with exponential backoff for transient failures
//! - Error classification (transient, blocked, permanent)

use crate::config::FetcherConfig;
use crate::crawler::retry::{RetryError, RetryPolicy};
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// How much of the body is searched for a `<meta>` charset declaration
const CHARSET_SNIFF_BYTES: usize = 4096;

const QUOTES: &[char] = &['"', '\''];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Decoded page body
        body: String,
        /// Attempts it took
        attempts: u32,
    },

    /// The server refused us (403 or 429)
    Blocked {
        /// The HTTP status code
        status_code: u16,
    },

    /// Permanent failure, or transient failures until attempts ran out
    Failed {
        /// Error description
        error: String,
        /// Attempts made
        attempts: u32,
    },
}

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("TLS negotiation failed: {0}")]
    Tls(String),

    #[error("server error: HTTP {0}")]
    ServerError(u16),

    #[error("blocked: HTTP {0}")]
    Blocked(u16),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Errors worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout
                | FetchError::Connect(_)
                | FetchError::Tls(_)
                | FetchError::ServerError(_)
        )
    }

    /// Classifies a reqwest error
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return FetchError::Timeout;
        }

        let chain = error_chain(&error);
        if error.is_connect() {
            let lowered = chain.to_lowercase();
            if lowered.contains("tls")
                || lowered.contains("certificate")
                || lowered.contains("handshake")
            {
                return FetchError::Tls(chain);
            }
            return FetchError::Connect(chain);
        }

        // Resets mid-request or mid-body surface as request/body errors
        if error.is_request() || error.is_body() {
            return FetchError::Connect(chain);
        }

        FetchError::Other(chain)
    }

    /// Maps a non-success status to an error
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                FetchError::Blocked(status.as_u16())
            }
            s if s.is_server_error() => FetchError::ServerError(s.as_u16()),
            s => FetchError::Status(s.as_u16()),
        }
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Default request headers mimicking a desktop browser
pub fn browser_headers(accept_language: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    if let Ok(value) = HeaderValue::from_str(accept_language) {
        headers.insert(header::ACCEPT_LANGUAGE, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

/// The origin of `url` with a trailing slash, used as referer
pub fn referer_for(url: &Url) -> Option<String> {
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Some(format!("{}/", origin.ascii_serialization())),
        url::Origin::Opaque(_) => None,
    }
}

/// Builds an HTTP client with proper configuration
///
/// Accept-Encoding is left to reqwest so gzip and brotli bodies are
/// decompressed transparently.
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(browser_headers(&config.accept_language))
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher with retry
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy<FetchError>,
}

impl Fetcher {
    /// Builds a fetcher from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, fetch_policy(config)))
    }

    pub fn with_client(client: Client, policy: RetryPolicy<FetchError>) -> Self {
        Self { client, policy }
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Success |
    /// | HTTP 403, 429 | Immediate → Blocked |
    /// | HTTP 5xx | Retry with backoff |
    /// | Other HTTP 4xx | Immediate → Failed |
    /// | Timeout, reset, TLS error | Retry with backoff |
    ///
    /// The body is decoded with the charset from `Content-Type`, else the
    /// one declared by a `<meta>` tag, else UTF-8 with replacement
    /// characters.
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        let result = self
            .policy
            .run(|attempt| async move {
                if attempt > 1 {
                    tracing::debug!("Retrying {} (attempt {})", url, attempt);
                }
                self.fetch_once(url).await.map(|page| (page, attempt))
            })
            .await;

        match result {
            Ok(((final_url, status_code, body), attempts)) => {
                FetchResult::Success {
                    final_url,
                    status_code,
                    body,
                    attempts,
                }
            }
            Err(RetryError {
                error: FetchError::Blocked(status_code),
                ..
            }) => FetchResult::Blocked { status_code },
            Err(RetryError { attempts, error }) => FetchResult::Failed {
                error: error.to_string(),
                attempts,
            },
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<(String, u16, String), FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(referer) = referer_for(url) {
            request = request.header(header::REFERER, referer);
        }

        let response = request.send().await.map_err(FetchError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;
        let body = decode_body(&bytes, content_type.as_deref());

        Ok((final_url, status.as_u16(), body))
    }
}

/// Decodes a response body to text
///
/// A byte order mark wins over any declared charset; undecodable sequences
/// become U+FFFD.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_meta_charset(bytes).and_then(|l| Encoding::for_label(l.as_bytes())))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("Body had invalid {} sequences", used.name());
    }
    text.into_owned()
}

/// The `charset` parameter of a `Content-Type` value
fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(QUOTES);
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Finds `<meta charset=...>` or an `http-equiv` content charset in the
/// head of the document
fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(CHARSET_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];

        if let Some(pos) = tag.find("charset") {
            let value = tag[pos + "charset".len()..]
                .trim_start()
                .strip_prefix('=')
                .map(|v| v.trim_start().trim_start_matches(QUOTES));
            if let Some(value) = value {
                let label: String = value
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || matches!(*c, '-' | '_' | ':' | '.'))
                    .collect();
                if !label.is_empty() {
                    return Some(label);
                }
            }
        }

        rest = &rest[start + "<meta".len()..];
    }
    None
}

/// Retry policy for page fetches
pub fn fetch_policy(config: &FetcherConfig) -> RetryPolicy<FetchError> {
    RetryPolicy::new(
        config.max_attempts,
        Duration::from_millis(config.base_delay_ms),
        FetchError::is_transient,
    )
}
