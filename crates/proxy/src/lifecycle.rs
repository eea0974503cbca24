//! Install and activate steps.
//!
//! Install populates the versioned bucket from the precache manifest,
//! all-or-nothing. Activate deletes every other bucket before handing
//! control to the new version.

use std::sync::Arc;

use futures_util::future::join_all;
use lownet_client::Fetcher;
use lownet_core::{Bucket, CacheStorage, Error};
use serde::Serialize;
use url::Url;

use crate::manifest::PrecacheManifest;

/// Signal returned to the host when a lifecycle step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSignal {
    /// Install finished; do not wait for old clients to close.
    SkipWaiting,
    /// Activate finished; take control of open clients now.
    ClaimClients,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub bucket: String,
    pub cached: usize,
    pub signal: LifecycleSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateOutcome {
    pub bucket: String,
    pub deleted: Vec<String>,
    pub signal: LifecycleSignal,
}

/// Open `cache_name` and store every manifest entry in it.
///
/// All manifest fetches run concurrently and must all return a 2xx status
/// before anything is written; the write itself is a single `put_all`.
/// If the bucket did not exist beforehand, a failed install deletes it again.
pub async fn install(
    storage: Arc<dyn CacheStorage>, fetcher: &dyn Fetcher, origin: &Url, cache_name: &str,
    manifest: &PrecacheManifest,
) -> Result<InstallOutcome, Error> {
    tracing::info!(bucket = cache_name, entries = manifest.len(), "installing");

    let existed = storage.keys().await?.iter().any(|name| name == cache_name);
    let bucket = Bucket::open(storage.clone(), cache_name).await?;

    match populate(&bucket, fetcher, origin, manifest).await {
        Ok(cached) => {
            tracing::info!(bucket = cache_name, cached, "install complete");
            Ok(InstallOutcome { bucket: cache_name.to_string(), cached, signal: LifecycleSignal::SkipWaiting })
        }
        Err(e) => {
            if !existed && let Err(cleanup) = storage.delete(cache_name).await {
                tracing::warn!(bucket = cache_name, error = %cleanup, "could not remove bucket of failed install");
            }
            Err(e)
        }
    }
}

async fn populate(
    bucket: &Bucket, fetcher: &dyn Fetcher, origin: &Url, manifest: &PrecacheManifest,
) -> Result<usize, Error> {
    let requests = manifest.requests(origin)?;

    let results = join_all(requests.iter().map(|request| fetcher.fetch(request))).await;

    let mut entries = Vec::with_capacity(requests.len());
    for (request, result) in requests.iter().zip(results) {
        let response = result.map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
        if !response.status.is_success() {
            return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status.as_u16())));
        }
        entries.push((request.key(), response.to_stored()));
    }

    let cached = entries.len();
    bucket
        .add_all(entries)
        .await
        .map_err(|e| Error::InstallFailed(format!("storing precache: {e}")))?;
    Ok(cached)
}

/// Delete every bucket except `cache_name`.
///
/// All deletions complete before the claim signal is returned.
pub async fn activate(storage: &dyn CacheStorage, cache_name: &str) -> Result<ActivateOutcome, Error> {
    let stale: Vec<String> = storage
        .keys()
        .await?
        .into_iter()
        .filter(|name| name != cache_name)
        .collect();

    let results = join_all(stale.iter().map(|name| storage.delete(name))).await;

    let mut deleted = Vec::with_capacity(stale.len());
    for (name, result) in stale.into_iter().zip(results) {
        if result? {
            deleted.push(name);
        }
    }

    tracing::info!(bucket = cache_name, deleted = deleted.len(), "activated");
    Ok(ActivateOutcome { bucket: cache_name.to_string(), deleted, signal: LifecycleSignal::ClaimClients })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ORIGIN, ScriptedFetcher, origin};
    use lownet_core::{MemoryStorage, RequestKey, ResponseType};

    fn storage() -> Arc<dyn CacheStorage> {
        Arc::new(MemoryStorage::new())
    }

    fn scripted() -> ScriptedFetcher {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/toolkit.html", 200, ResponseType::Basic, "toolkit v1");
        fetcher.respond("/", 200, ResponseType::Basic, "index v1");
        fetcher
    }

    #[tokio::test]
    async fn test_install_populates_manifest() {
        let storage = storage();
        let fetcher = scripted();

        let outcome = install(storage.clone(), &fetcher, &origin(), "lownet-v2", &PrecacheManifest::default())
            .await
            .unwrap();

        assert_eq!(outcome.signal, LifecycleSignal::SkipWaiting);
        assert_eq!(outcome.cached, 2);
        assert_eq!(
            storage.entries("lownet-v2").await.unwrap(),
            vec![RequestKey::get(format!("{ORIGIN}/toolkit.html")), RequestKey::get(format!("{ORIGIN}/"))]
        );
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let storage = storage();
        let fetcher = scripted();
        let manifest = PrecacheManifest::default();

        install(storage.clone(), &fetcher, &origin(), "lownet-v2", &manifest).await.unwrap();
        install(storage.clone(), &fetcher, &origin(), "lownet-v2", &manifest).await.unwrap();

        let entries = storage.entries("lownet-v2").await.unwrap();
        assert_eq!(entries.len(), manifest.len());
        assert_eq!(storage.keys().await.unwrap(), vec!["lownet-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_install_fails_on_network_error() {
        let storage = storage();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/toolkit.html", 200, ResponseType::Basic, "toolkit v1");
        fetcher.fail("/");

        let result = install(storage.clone(), &fetcher, &origin(), "lownet-v2", &PrecacheManifest::default()).await;

        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let storage = storage();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("/toolkit.html", 404, ResponseType::Basic, "missing");
        fetcher.respond("/", 200, ResponseType::Basic, "index v1");

        let result = install(storage.clone(), &fetcher, &origin(), "lownet-v2", &PrecacheManifest::default()).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("status 404"));
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_install_keeps_existing_buckets() {
        let storage = storage();
        let fetcher = scripted();
        let manifest = PrecacheManifest::default();
        storage.open("lownet-v1").await.unwrap();
        install(storage.clone(), &fetcher, &origin(), "lownet-v2", &manifest).await.unwrap();

        fetcher.fail("/");
        let result = install(storage.clone(), &fetcher, &origin(), "lownet-v2", &manifest).await;

        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(storage.keys().await.unwrap(), vec!["lownet-v1".to_string(), "lownet-v2".to_string()]);
        assert_eq!(storage.entries("lownet-v2").await.unwrap().len(), manifest.len());
    }

    #[tokio::test]
    async fn test_activate_leaves_only_current() {
        let storage = storage();
        for name in ["lownet-v110", "lownet-v111", "lownet-v112", "other"] {
            storage.open(name).await.unwrap();
        }

        let outcome = activate(storage.as_ref(), "lownet-v112").await.unwrap();

        assert_eq!(outcome.signal, LifecycleSignal::ClaimClients);
        assert_eq!(outcome.deleted, vec!["lownet-v110", "lownet-v111", "other"]);
        assert_eq!(storage.keys().await.unwrap(), vec!["lownet-v112".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_without_stale_buckets() {
        let storage = storage();
        storage.open("lownet-v112").await.unwrap();

        let outcome = activate(storage.as_ref(), "lownet-v112").await.unwrap();

        assert!(outcome.deleted.is_empty());
        assert_eq!(storage.keys().await.unwrap().len(), 1);
    }
}
