//! Fetch interception: bypass rules, then stale-while-revalidate.

use std::fmt;
use std::sync::Arc;

use lownet_client::{Fetcher, NetworkResponse, ProxyRequest};
use lownet_core::{Bucket, Error, RequestKey};
use reqwest::Method;
use serde::Serialize;

use crate::proxy::CacheProxy;
use crate::rules::BypassRule;

/// Why a request was left to the network untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassThroughReason {
    /// Only GET requests are cached.
    Method(Method),
    /// A bypass rule matched.
    Rule(BypassRule),
    /// The proxy has not been activated yet.
    Inactive,
}

impl fmt::Display for PassThroughReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassThroughReason::Method(method) => write!(f, "method {method}"),
            PassThroughReason::Rule(rule) => write!(f, "{rule}"),
            PassThroughReason::Inactive => f.write_str("proxy not active"),
        }
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// Result of intercepting one request.
#[derive(Debug)]
pub enum Interception {
    /// The proxy did not handle the request.
    PassThrough(PassThroughReason),
    /// The proxy answered the request.
    Respond { response: NetworkResponse, source: ResponseSource },
}

impl Interception {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Interception::PassThrough(_))
    }
}

impl CacheProxy {
    /// Decide whether the request is cached and, if so, serve it
    /// stale-while-revalidate from the current bucket.
    ///
    /// A cold-cache network failure is returned as the error. Failures of
    /// the background refresh and of any storage write are not.
    pub async fn intercept(&self, request: &ProxyRequest) -> Result<Interception, Error> {
        if request.method != Method::GET {
            return Ok(Interception::PassThrough(PassThroughReason::Method(request.method.clone())));
        }

        if let Some(rule) = self.rules().matching(&request.url) {
            tracing::debug!(url = %request.url, rule = %rule, "cache bypass");
            return Ok(Interception::PassThrough(PassThroughReason::Rule(rule.clone())));
        }

        if !self.is_active() {
            tracing::debug!(url = %request.url, "proxy not active");
            return Ok(Interception::PassThrough(PassThroughReason::Inactive));
        }

        let bucket = self.current_bucket();
        let key = request.key();

        let cached = match bucket.match_request(&key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(bucket = bucket.name(), request = %key, error = %e, "cache lookup failed");
                None
            }
        };

        if let Some(stored) = cached {
            match NetworkResponse::from_stored(&stored) {
                Ok(response) => {
                    tracing::debug!(request = %key, "cache hit");
                    self.spawn_refresh(request.clone());
                    return Ok(Interception::Respond { response, source: ResponseSource::Cache });
                }
                Err(e) => tracing::warn!(request = %key, error = %e, "unreadable cache entry"),
            }
        }

        tracing::debug!(request = %key, "cache miss");
        let response = self.fetcher().fetch(request).await?;
        if response.is_cacheable() {
            store(&bucket, &key, &response).await;
        }

        Ok(Interception::Respond { response, source: ResponseSource::Network })
    }

    fn spawn_refresh(&self, request: ProxyRequest) {
        let fetcher = self.fetcher().clone();
        let bucket = self.current_bucket();
        self.refreshes()
            .spawn(request.key().to_string(), refresh(fetcher, bucket, request));
    }
}

async fn refresh(fetcher: Arc<dyn Fetcher>, bucket: Bucket, request: ProxyRequest) -> Result<(), Error> {
    let response = fetcher.fetch(&request).await?;
    if response.is_cacheable() {
        bucket.put(&request.key(), &response.duplicate().to_stored()).await?;
    }
    Ok(())
}

async fn store(bucket: &Bucket, key: &RequestKey, response: &NetworkResponse) {
    if let Err(e) = bucket.put(key, &response.duplicate().to_stored()).await {
        tracing::warn!(bucket = bucket.name(), request = %key, error = %e, "cache write failed");
    }
}
