//! Client for the Pixabay image search endpoint.
//!
//! Building the request URL and interpreting the response are plain
//! functions. The core reaches the network only through [`ImageApi`], which
//! hands the request to the `crux_http` capability and maps the answer back
//! into an [`Event`].

use crux_http::http::headers::ACCEPT;
use crux_http::http::{Method, StatusCode};
use crux_http::{Error as HttpError, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;
use zeroize::Zeroize;

use crate::capabilities::AppHttp;
use crate::event::Event;
use crate::model::{FetchTicket, ImageItem};
use crate::{
    DEFAULT_API_BASE_URL, DEFAULT_IMAGE_TYPE, DEFAULT_ORIENTATION, DEFAULT_PER_PAGE,
    DEFAULT_REQUEST_TIMEOUT, MAX_PER_PAGE, MAX_REQUEST_TIMEOUT_MS, MIN_PER_PAGE,
};

/// Longest slice of an error body kept in [`FetchError::Api`].
const MAX_ERROR_BODY_CHARS: usize = 200;
const MAX_URL_LENGTH: usize = 2048;

// --- Configuration ---

/// API key. Redacted in `Debug`, wiped on drop.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("[EMPTY]")
        } else {
            f.write_str("[REDACTED]")
        }
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    pub per_page: u32,
    pub image_type: String,
    pub orientation: String,
    pub safe_search: bool,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: ApiKey::default(),
            per_page: DEFAULT_PER_PAGE,
            image_type: DEFAULT_IMAGE_TYPE.to_string(),
            orientation: DEFAULT_ORIENTATION.to_string(),
            safe_search: true,
            request_timeout_ms: u64::try_from(DEFAULT_REQUEST_TIMEOUT.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = ApiKey::new(key);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(MIN_PER_PAGE..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(ConfigError::PerPageOutOfRange {
                value: self.per_page,
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return Err(ConfigError::TimeoutTooLong {
                value_ms: self.request_timeout_ms,
            });
        }
        Ok(())
    }
}

/// An absolute `http`/`https` URL without credentials that does not point at
/// a private network.
fn validate_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl { reason };

    if raw.trim().is_empty() {
        return Err(invalid("URL cannot be empty".into()));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(invalid(format!(
            "URL exceeds maximum length of {MAX_URL_LENGTH} bytes"
        )));
    }

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(invalid(format!(
            "invalid scheme '{scheme}', only 'http' and 'https' are allowed"
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| invalid("URL must have a host".into()))?
        .to_lowercase();
    if is_private_host(&host) {
        return Err(invalid(format!("private network host '{host}' is blocked")));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials in URL are not allowed".into()));
    }
    Ok(url)
}

fn is_private_host(host: &str) -> bool {
    if matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]" | "0.0.0.0") {
        return true;
    }
    if host.ends_with(".local") || host.ends_with(".localhost") || host.ends_with(".internal") {
        return true;
    }
    if host.starts_with("10.") || host.starts_with("192.168.") || host.starts_with("169.254.") {
        return true;
    }
    // 172.16.0.0/12
    if let Some(rest) = host.strip_prefix("172.") {
        if let Some(octet) = rest.split('.').next().and_then(|o| o.parse::<u8>().ok()) {
            return (16..=31).contains(&octet);
        }
    }
    false
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("invalid API base URL: {reason}")]
    InvalidBaseUrl { reason: String },

    #[error("no API key configured")]
    MissingApiKey,

    #[error("per_page {value} outside {}..={}", MIN_PER_PAGE, MAX_PER_PAGE)]
    PerPageOutOfRange { value: u32 },

    #[error("request timeout cannot be zero")]
    ZeroTimeout,

    #[error("request timeout {value_ms}ms exceeds {}ms", MAX_REQUEST_TIMEOUT_MS)]
    TimeoutTooLong { value_ms: u64 },
}

// --- Request / response types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub ticket: FetchTicket,
    pub query: String,
    pub page: u32,
}

/// One page of results. `total_hits` is the API's count of accessible matches,
/// not the number of items in this page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<ImageItem>,
    pub total_hits: u64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("image API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("image API rate limit exceeded")]
    RateLimited,

    #[error("invalid response from image API: {reason}")]
    InvalidResponse { reason: String },

    #[error("could not build search request: {reason}")]
    InvalidRequest { reason: String },
}

impl From<ConfigError> for FetchError {
    fn from(error: ConfigError) -> Self {
        Self::InvalidRequest {
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    total_hits: u64,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: u64,
    #[serde(rename = "webformatURL")]
    webformat_url: String,
    #[serde(rename = "largeImageURL")]
    large_image_url: String,
    #[serde(default)]
    tags: String,
}

impl From<Hit> for ImageItem {
    fn from(hit: Hit) -> Self {
        Self {
            id: hit.id,
            thumbnail_url: hit.webformat_url,
            full_url: hit.large_image_url,
            description: hit.tags,
        }
    }
}

// --- Request building / response parsing ---

/// The search URL for `query` and 1-based `page`. The query is percent-encoded.
pub fn build_search_url(config: &ApiConfig, query: &str, page: u32) -> Result<Url, ConfigError> {
    let mut url = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("key", config.api_key.expose())
        .append_pair("q", query)
        .append_pair("image_type", &config.image_type)
        .append_pair("orientation", &config.orientation)
        .append_pair("safesearch", if config.safe_search { "true" } else { "false" })
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &config.per_page.to_string());
    Ok(url)
}

/// Validates `config` and builds the URL for one page request.
pub fn search_url(config: &ApiConfig, request: &PageRequest) -> Result<Url, FetchError> {
    config.validate()?;
    Ok(build_search_url(config, &request.query, request.page)?)
}

/// Interprets what `crux_http` made of the shell's answer.
fn parse_search_result(
    result: crux_http::Result<Response<SearchResponse>>,
    timeout_ms: u64,
) -> Result<SearchPage, FetchError> {
    let mut response = result.map_err(|error| fetch_error(error, timeout_ms))?;
    let body = response
        .take_body()
        .ok_or_else(|| FetchError::InvalidResponse {
            reason: "empty response body".into(),
        })?;

    Ok(SearchPage {
        total_hits: body.total_hits,
        items: body.hits.into_iter().map(ImageItem::from).collect(),
    })
}

fn fetch_error(error: HttpError, timeout_ms: u64) -> FetchError {
    match error {
        HttpError::Http(error) if error.code == StatusCode::TooManyRequests => {
            FetchError::RateLimited
        }
        HttpError::Http(error) => {
            let body = error
                .body
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            let message = if body.trim().is_empty() {
                error.code.canonical_reason().to_string()
            } else {
                error_excerpt(&body)
            };
            FetchError::Api {
                status: u16::from(error.code),
                message,
            }
        }
        HttpError::Json(reason) => FetchError::InvalidResponse { reason },
        HttpError::Url(reason) => FetchError::InvalidRequest { reason },
        HttpError::Io(message) => FetchError::Network { message },
        HttpError::Timeout => FetchError::Timeout { timeout_ms },
    }
}

fn error_excerpt(body: &str) -> String {
    body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
}

// --- Capability ---

/// Image search on top of the HTTP capability.
pub struct ImageApi<'a> {
    http: &'a AppHttp,
}

impl<'a> ImageApi<'a> {
    pub fn new(http: &'a AppHttp) -> Self {
        Self { http }
    }

    /// Requests one page. `make_event` receives the parsed outcome once the
    /// shell resolves the HTTP effect. Fails synchronously only when no
    /// request could be built.
    pub fn fetch_page<F>(
        &self,
        config: &ApiConfig,
        request: &PageRequest,
        make_event: F,
    ) -> Result<(), FetchError>
    where
        F: FnOnce(Result<SearchPage, FetchError>) -> Event + Send + 'static,
    {
        let url = search_url(config, request)?;
        let timeout_ms = config.request_timeout_ms;
        debug!(
            ticket = %request.ticket,
            page = request.page,
            "requesting search page"
        );

        self.http
            .request(Method::Get, url)
            .header(ACCEPT, "application/json")
            .expect_json::<SearchResponse>()
            .send(move |result| make_event(parse_search_result(result, timeout_ms)));
        Ok(())
    }
}
