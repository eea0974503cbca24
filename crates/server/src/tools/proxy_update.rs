//! proxy_update tool implementation.
//!
//! Drives the lifecycle the way a host does on a version change: install,
//! and only if that succeeds, activate.

use lownet_core::Error;
use lownet_proxy::CacheProxy;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::json_text;

/// Output from the proxy_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyUpdateOutput {
    /// Current bucket name.
    pub bucket: String,
    /// Number of manifest entries stored.
    pub cached: usize,
    /// Buckets removed during activation.
    pub deleted: Vec<String>,
}

/// Install then activate. A failed install leaves the existing buckets in
/// place and the proxy passing requests through.
pub async fn run_lifecycle(proxy: &CacheProxy) -> Result<ProxyUpdateOutput, Error> {
    let installed = proxy.install().await?;
    let activated = proxy.activate().await?;

    Ok(ProxyUpdateOutput { bucket: activated.bucket, cached: installed.cached, deleted: activated.deleted })
}

/// Implementation of the proxy_update tool.
pub async fn update_impl(proxy: &CacheProxy) -> Result<CallToolResult, McpError> {
    let output = run_lifecycle(proxy).await?;
    Ok(CallToolResult::success(vec![Content::text(json_text(&output)?)]))
}
