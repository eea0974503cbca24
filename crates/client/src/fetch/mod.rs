//! Network subsystem behind the proxy.
//!
//! ### Response classification
//! - Final URL on the configured origin: `basic`
//! - Cross origin with `Access-Control-Allow-Origin`: `cors`
//! - Cross origin otherwise: `opaque`
//!
//! ### Status handling
//! Non-2xx statuses are responses, not errors. Only transport failures
//! (DNS, connect, TLS, reset, timeout) produce `Error::Network`.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use lownet_core::{AppConfig, Error, ResponseType, StoredResponse};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use std::time::{Duration, Instant};

use crate::request::ProxyRequest;

pub use self::url::{UrlError, canonicalize, resolve, same_origin};

/// Network seam used by the proxy; faked in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send the request and return whatever response arrives.
    async fn fetch(&self, request: &ProxyRequest) -> Result<NetworkResponse, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin whose responses count as same-origin.
    pub origin: Url,

    /// User agent string (default: "lownet/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: Url) -> Self {
        Self { origin, user_agent: "lownet/0.1".to_string(), timeout: None, max_redirects: 5 }
    }

    /// Build from the loaded application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        })
    }
}

/// Response from the network, or rebuilt from a stored snapshot.
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    /// The final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Origin classification
    pub response_type: ResponseType,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub body: Bytes,
    /// Time taken to fetch in milliseconds (0 when served from a bucket)
    pub fetch_ms: u64,
}

impl NetworkResponse {
    /// Status exactly 200 and same origin.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.response_type == ResponseType::Basic
    }

    /// Second handle on the same response; the body buffer is shared.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Snapshot for storage. Headers that are not valid UTF-8 are dropped.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        StoredResponse {
            url: self.url.to_string(),
            status: self.status.as_u16(),
            response_type: self.response_type,
            headers,
            body: self.body.clone(),
            stored_at: Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a stored snapshot.
    pub fn from_stored(stored: &StoredResponse) -> Result<Self, Error> {
        let url = Url::parse(&stored.url).map_err(|e| Error::Serialization(format!("stored url: {e}")))?;
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::Serialization(format!("stored status {}: {e}", stored.status)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Ok(Self { url, status, response_type: stored.response_type, headers, body: stored.body.clone(), fetch_ms: 0 })
    }
}

/// Classify a response by where it was finally served from.
pub fn classify_response(origin: &Url, final_url: &Url, headers: &HeaderMap) -> ResponseType {
    if same_origin(origin, final_url) {
        ResponseType::Basic
    } else if headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
        ResponseType::Cors
    } else {
        ResponseType::Opaque
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<NetworkResponse, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} {}: {}", request.method, request.url, e)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let response_type = classify_response(&self.config.origin, &final_url, &headers);

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            final_url,
            response_type,
            fetch_ms,
            body.len()
        );

        Ok(NetworkResponse { url: final_url, status, response_type, headers, body, fetch_ms })
    }
}
