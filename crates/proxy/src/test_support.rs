//! Fakes for the storage and network seams.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use lownet_client::{Fetcher, NetworkResponse, ProxyRequest};
use lownet_core::{CacheStorage, Error, MemoryStorage, RequestKey, ResponseType, StoredResponse};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

pub(crate) const ORIGIN: &str = "https://lownet.test";

pub(crate) fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub(crate) fn get(path: &str) -> ProxyRequest {
    ProxyRequest::get(origin().join(path).unwrap())
}

#[derive(Clone)]
enum Scripted {
    Respond { status: u16, response_type: ResponseType, body: &'static str },
    Fail,
    Hang,
}

/// Fetcher answering by URL path from a mutable script.
pub(crate) struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Scripted>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()), calls: AtomicUsize::new(0) }
    }

    pub(crate) fn respond(&self, path: &str, status: u16, response_type: ResponseType, body: &'static str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Respond { status, response_type, body });
    }

    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Scripted::Fail);
    }

    /// Never answer requests for `path`.
    pub(crate) fn hang(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Scripted::Hang);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<NetworkResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let route = self.routes.lock().unwrap().get(request.url.path()).cloned();

        match route {
            Some(Scripted::Respond { status, response_type, body }) => {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
                Ok(NetworkResponse {
                    url: request.url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    response_type,
                    headers,
                    body: Bytes::from_static(body.as_bytes()),
                    fetch_ms: 1,
                })
            }
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::Fail) => Err(Error::Network(format!("{}: connection refused", request.url))),
            None => Err(Error::Network(format!("{}: no route", request.url))),
        }
    }
}

/// In-memory storage that counts every call made through the trait.
#[derive(Default)]
pub(crate) struct CountingStorage {
    inner: MemoryStorage,
    calls: AtomicUsize,
}

impl CountingStorage {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStorage for CountingStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.tick();
        self.inner.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.tick();
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.tick();
        self.inner.delete(name).await
    }

    async fn match_request(&self, name: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.tick();
        self.inner.match_request(name, key).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        self.tick();
        self.inner.put(name, key, response).await
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error> {
        self.tick();
        self.inner.put_all(name, entries).await
    }

    async fn entries(&self, name: &str) -> Result<Vec<RequestKey>, Error> {
        self.tick();
        self.inner.entries(name).await
    }
}
