//! cache_keys tool implementation.
//!
//! Lists bucket names in creation order.

use lownet_proxy::CacheProxy;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::json_text;

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// Every bucket name in the store.
    pub buckets: Vec<String>,
    /// Name of the bucket lookups are pinned to.
    pub current: String,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(proxy: &CacheProxy) -> Result<CallToolResult, McpError> {
    let buckets = proxy.storage().keys().await?;
    let output = CacheKeysOutput { buckets, current: proxy.cache_name().to_string() };

    Ok(CallToolResult::success(vec![Content::text(json_text(&output)?)]))
}
