//! cache_entries tool implementation.
//!
//! Lists request descriptors stored in a bucket.

use lownet_core::{Error, RequestKey};
use lownet_proxy::CacheProxy;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::json_text;

/// Parameters for the cache_entries tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesParams {
    /// Bucket to list. Defaults to the current bucket.
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_entries tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesOutput {
    pub bucket: String,
    pub entries: Vec<RequestKey>,
}

/// Implementation of the cache_entries tool.
pub async fn entries_impl(proxy: &CacheProxy, params: CacheEntriesParams) -> Result<CallToolResult, McpError> {
    let bucket = params.bucket.unwrap_or_else(|| proxy.cache_name().to_string());
    if bucket.trim().is_empty() {
        return Err(Error::InvalidInput("bucket cannot be empty".into()).into());
    }

    let entries = proxy.storage().entries(&bucket).await?;
    let output = CacheEntriesOutput { bucket, entries };

    Ok(CallToolResult::success(vec![Content::text(json_text(&output)?)]))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::test_util::output;
    use lownet_client::{FetchConfig, HttpFetcher};
    use lownet_core::{CacheStorage, MemoryStorage, ResponseType, StoredResponse};

    async fn proxy_with_entry() -> CacheProxy {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        storage.open("lownet-v112").await.unwrap();
        storage
            .put(
                "lownet-v112",
                &RequestKey::get("http://127.0.0.1:8080/toolkit.html"),
                &StoredResponse {
                    url: "http://127.0.0.1:8080/toolkit.html".into(),
                    status: 200,
                    response_type: ResponseType::Basic,
                    headers: Vec::new(),
                    body: "toolkit".into(),
                    stored_at: "2026-10-19T00:00:00Z".into(),
                },
            )
            .await
            .unwrap();
        let origin = reqwest::Url::parse("http://127.0.0.1:8080").unwrap();
        let fetcher = HttpFetcher::new(FetchConfig::new(origin.clone())).unwrap();
        CacheProxy::new(storage, Arc::new(fetcher), origin, "lownet-v112")
    }

    #[tokio::test]
    async fn test_entries_default_bucket() {
        let proxy = proxy_with_entry().await;

        let result = entries_impl(&proxy, CacheEntriesParams::default()).await.unwrap();
        let out: CacheEntriesOutput = output(&result);

        assert_eq!(out.bucket, "lownet-v112");
        assert_eq!(out.entries, vec![RequestKey::get("http://127.0.0.1:8080/toolkit.html")]);
    }

    #[tokio::test]
    async fn test_entries_unknown_bucket_is_empty() {
        let proxy = proxy_with_entry().await;

        let params = CacheEntriesParams { bucket: Some("lownet-v1".into()) };
        let out: CacheEntriesOutput = output(&entries_impl(&proxy, params).await.unwrap());

        assert!(out.entries.is_empty());
    }

    #[tokio::test]
    async fn test_entries_empty_name() {
        let proxy = proxy_with_entry().await;

        let params = CacheEntriesParams { bucket: Some(" ".into()) };
        assert!(entries_impl(&proxy, params).await.is_err());
    }
}
