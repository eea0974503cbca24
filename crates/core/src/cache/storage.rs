//! Storage trait for named buckets and a per-bucket handle.

use std::sync::Arc;

use async_trait::async_trait;

use super::entry::{RequestKey, StoredResponse};
use crate::Error;

/// Named-bucket key-value store shared by every proxy task.
///
/// Individual writes are atomic; there are no cross-key transactions
/// except [`CacheStorage::put_all`], which applies all entries or none.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a bucket, creating it if absent.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Bucket names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a bucket and all of its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up a stored response in the named bucket.
    ///
    /// A missing bucket is a miss, not an error.
    async fn match_request(&self, name: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error>;

    /// Store a response, replacing any prior entry for the descriptor.
    ///
    /// Fails with [`Error::BucketMissing`] if the bucket was deleted.
    async fn put(&self, name: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error>;

    /// Store every entry or none of them.
    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error>;

    /// Request descriptors stored in the named bucket, in insertion order.
    async fn entries(&self, name: &str) -> Result<Vec<RequestKey>, Error>;
}

/// Handle to one bucket of a shared store.
#[derive(Clone)]
pub struct Bucket {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl Bucket {
    /// Handle to `name` without touching storage.
    pub fn new(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Self {
        Self { storage, name: name.into() }
    }

    /// Open (creating if absent) and return a handle.
    pub async fn open(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Result<Self, Error> {
        let bucket = Self::new(storage, name);
        bucket.storage.open(&bucket.name).await?;
        Ok(bucket)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn match_request(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.storage.match_request(&self.name, key).await
    }

    pub async fn put(&self, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        self.storage.put(&self.name, key, response).await
    }

    /// Populate the bucket all-or-nothing.
    pub async fn add_all(&self, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error> {
        self.storage.put_all(&self.name, entries).await
    }

    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        self.storage.entries(&self.name).await
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish_non_exhaustive()
    }
}
