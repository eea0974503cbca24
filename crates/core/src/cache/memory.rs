//! In-memory bucket store.
//!
//! Buckets live in a Vec behind a tokio RwLock so that enumeration keeps
//! creation order. Useful for tests and for running without a database file.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::entry::{RequestKey, StoredResponse};
use super::storage::CacheStorage;
use crate::Error;

struct MemoryBucket {
    name: String,
    entries: Vec<(String, RequestKey, StoredResponse)>,
}

impl MemoryBucket {
    fn upsert(&mut self, key: &RequestKey, response: &StoredResponse) {
        let hash = key.hash();
        match self.entries.iter_mut().find(|(h, _, _)| *h == hash) {
            Some(slot) => *slot = (hash, key.clone(), response.clone()),
            None => self.entries.push((hash, key.clone(), response.clone())),
        }
    }
}

/// Process-local implementation of [`CacheStorage`].
#[derive(Default)]
pub struct MemoryStorage {
    buckets: RwLock<Vec<MemoryBucket>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage").finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        if !buckets.iter().any(|b| b.name == name) {
            buckets.push(MemoryBucket { name: name.to_string(), entries: Vec::new() });
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().map(|b| b.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|b| b.name != name);
        Ok(buckets.len() < before)
    }

    async fn match_request(&self, name: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let hash = key.hash();
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find(|b| b.name == name)
            .and_then(|b| b.entries.iter().find(|(h, _, _)| *h == hash))
            .map(|(_, _, response)| response.clone()))
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::BucketMissing(name.to_string()))?;
        bucket.upsert(key, response);
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::BucketMissing(name.to_string()))?;
        for (key, response) in &entries {
            bucket.upsert(key, response);
        }
        Ok(())
    }

    async fn entries(&self, name: &str) -> Result<Vec<RequestKey>, Error> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.entries.iter().map(|(_, key, _)| key.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::cache::entry::ResponseType;
    use crate::cache::storage::Bucket;

    fn make_response(body: &'static str) -> StoredResponse {
        StoredResponse {
            url: "https://lownet.test/".to_string(),
            status: 200,
            response_type: ResponseType::Basic,
            headers: Vec::new(),
            body: Bytes::from_static(body.as_bytes()),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_bucket_handle_roundtrip() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let bucket = Bucket::open(storage.clone(), "lownet-v1").await.unwrap();
        let key = RequestKey::get("https://lownet.test/");

        bucket.put(&key, &make_response("index")).await.unwrap();

        let stored = bucket.match_request(&key).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"index"));
        assert_eq!(bucket.keys().await.unwrap(), vec![key]);
        assert_eq!(storage.keys().await.unwrap(), vec!["lownet-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = MemoryStorage::new();
        storage.open("lownet-v1").await.unwrap();
        storage.open("lownet-v2").await.unwrap();
        storage.open("lownet-v1").await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["lownet-v1".to_string(), "lownet-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let storage = MemoryStorage::new();
        storage.open("lownet-v1").await.unwrap();

        assert!(storage.delete("lownet-v1").await.unwrap());
        assert!(!storage.delete("lownet-v1").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_into_missing_bucket() {
        let storage = MemoryStorage::new();
        let key = RequestKey::get("https://lownet.test/");

        let result = storage.put("lownet-v1", &key, &make_response("index")).await;
        assert!(matches!(result, Err(Error::BucketMissing(_))));
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_all_overwrites() {
        let storage = MemoryStorage::new();
        storage.open("lownet-v1").await.unwrap();
        let key = RequestKey::get("https://lownet.test/");

        storage
            .put_all("lownet-v1", vec![(key.clone(), make_response("first"))])
            .await
            .unwrap();
        storage
            .put_all("lownet-v1", vec![(key.clone(), make_response("second"))])
            .await
            .unwrap();

        let stored = storage.match_request("lownet-v1", &key).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"second"));
        assert_eq!(storage.entries("lownet-v1").await.unwrap().len(), 1);
    }
}
