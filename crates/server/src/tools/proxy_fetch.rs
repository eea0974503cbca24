//! proxy_fetch tool implementation.
//!
//! Runs one request through the proxy. Requests the proxy passes through
//! are sent to the network unmodified.

use lownet_client::{Fetcher, ProxyRequest};
use lownet_client::fetch::resolve;
use lownet_core::{Error, ResponseType};
use lownet_proxy::{CacheProxy, Interception, ProxyHandlers, ResponseSource};
use reqwest::Method;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, json_text};

/// Input parameters for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute URL or a path relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body, sent only for pass-through requests.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Where the response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Cache,
    Network,
    Passthrough,
}

impl From<ResponseSource> for FetchSource {
    fn from(source: ResponseSource) -> Self {
        match source {
            ResponseSource::Cache => FetchSource::Cache,
            ResponseSource::Network => FetchSource::Network,
        }
    }
}

/// Output structure for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// The URL requested, after resolution against the origin.
    pub url: String,
    /// The URL the response was served from.
    pub final_url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub content_type: Option<String>,
    pub source: FetchSource,
    /// Why the cache was skipped, for pass-through requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass: Option<String>,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the proxy_fetch tool.
pub async fn fetch_impl(proxy: &CacheProxy, params: ProxyFetchParams) -> Result<CallToolResult, McpError> {
    let method = Method::from_bytes(params.method.trim().to_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidMethod(params.method.clone()))?;
    let url = resolve(proxy.origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = ProxyRequest::new(method, url);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let (response, source, bypass) = match proxy.on_fetch(&request).await? {
        Interception::Respond { response, source } => (response, source.into(), None),
        Interception::PassThrough(reason) => {
            tracing::debug!(url = %request.url, reason = %reason, "pass-through");
            let response = proxy.fetcher().fetch(&request).await?;
            (response, FetchSource::Passthrough, Some(reason.to_string()))
        }
    };

    let output = ProxyFetchOutput {
        url: request.url.to_string(),
        final_url: response.url.to_string(),
        status: response.status.as_u16(),
        response_type: response.response_type,
        content_type: response.content_type().map(str::to_string),
        source,
        bypass,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    Ok(CallToolResult::success(vec![Content::text(json_text(&output)?)]))
}
