//! The proxy and its host-facing handler interface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lownet_client::{Fetcher, ProxyRequest};
use lownet_core::{Bucket, CacheStorage, Error};
use url::Url;

use crate::interceptor::Interception;
use crate::lifecycle::{self, ActivateOutcome, InstallOutcome, LifecycleSignal};
use crate::manifest::PrecacheManifest;
use crate::refresh::RefreshTracker;
use crate::rules::RuleSet;

/// Handlers the host dispatches lifecycle and fetch events to.
#[async_trait]
pub trait ProxyHandlers: Send + Sync {
    async fn on_install(&self) -> Result<LifecycleSignal, Error>;

    async fn on_activate(&self) -> Result<LifecycleSignal, Error>;

    async fn on_fetch(&self, request: &ProxyRequest) -> Result<Interception, Error>;
}

/// Stale-while-revalidate proxy for a single origin.
///
/// Storage and network are injected, so several proxies can share one
/// store. Lookups and writes are pinned to the bucket named `cache_name`.
///
/// Until [`CacheProxy::activate`] succeeds the proxy intercepts nothing:
/// every request passes through to the network and storage is untouched.
pub struct CacheProxy {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    cache_name: String,
    rules: RuleSet,
    manifest: PrecacheManifest,
    refreshes: RefreshTracker,
    active: AtomicBool,
}

impl CacheProxy {
    /// Create a proxy with the default bypass rules and precache manifest.
    pub fn new(
        storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, origin: Url, cache_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            origin,
            cache_name: cache_name.into(),
            rules: RuleSet::default(),
            manifest: PrecacheManifest::default(),
            refreshes: RefreshTracker::new(),
            active: AtomicBool::new(false),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_manifest(mut self, manifest: PrecacheManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn manifest(&self) -> &PrecacheManifest {
        &self.manifest
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn refreshes(&self) -> &RefreshTracker {
        &self.refreshes
    }

    /// Whether activate has completed for this version.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Handle to the current bucket. Does not create it.
    pub fn current_bucket(&self) -> Bucket {
        Bucket::new(self.storage.clone(), self.cache_name.clone())
    }

    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        lifecycle::install(self.storage.clone(), self.fetcher.as_ref(), &self.origin, &self.cache_name, &self.manifest)
            .await
    }

    pub async fn activate(&self) -> Result<ActivateOutcome, Error> {
        let outcome = lifecycle::activate(self.storage.as_ref(), &self.cache_name).await?;
        self.active.store(true, Ordering::Release);
        Ok(outcome)
    }
}

#[async_trait]
impl ProxyHandlers for CacheProxy {
    async fn on_install(&self) -> Result<LifecycleSignal, Error> {
        Ok(self.install().await?.signal)
    }

    async fn on_activate(&self) -> Result<LifecycleSignal, Error> {
        Ok(self.activate().await?.signal)
    }

    async fn on_fetch(&self, request: &ProxyRequest) -> Result<Interception, Error> {
        self.intercept(request).await
    }
}

impl std::fmt::Debug for CacheProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheProxy")
            .field("origin", &self.origin.as_str())
            .field("cache_name", &self.cache_name)
            .field("rules", &self.rules)
            .field("manifest", &self.manifest)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
