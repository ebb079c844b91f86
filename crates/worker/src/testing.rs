//! Fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sp1sh_client::Fetcher;
use sp1sh_core::http::format_http_date;
use sp1sh_core::{AppConfig, CacheStore, EntryMeta, Error, MemoryStore, Request, Response};
use url::Url;

use crate::classify::Classifier;
use crate::names::CacheNames;
use crate::strategy::Dispatcher;

pub(crate) const ORIGIN: &str = "https://sp1sh.dev";

pub(crate) fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

pub(crate) fn get(path: &str) -> Request {
    Request::get(Url::parse(&url(path)).unwrap())
}

pub(crate) fn ok_response(body: &str) -> Response {
    Response::new(200, "OK")
        .with_header("content-type", "text/plain")
        .with_header("date", &format_http_date(chrono::Utc::now()))
        .with_body(body)
}

pub(crate) fn config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), ..Default::default() }
}

pub(crate) fn dispatcher(store: &MemoryStore, fetcher: Arc<FakeFetcher>) -> Dispatcher {
    dispatcher_with(Arc::new(store.clone()), fetcher)
}

pub(crate) fn dispatcher_with(store: Arc<dyn CacheStore>, fetcher: Arc<FakeFetcher>) -> Dispatcher {
    let origin = Url::parse(ORIGIN).unwrap();
    let classifier = Classifier::new(origin.clone(), vec!["/fonts/".into(), "/optimized/".into()]);
    Dispatcher::new(classifier, CacheNames::new("v1.0.0"), origin.join("/offline").unwrap(), store, fetcher)
}

#[derive(Debug, Clone)]
enum Script {
    Respond(Response),
    Fail,
    Hang,
}

/// Scripted network. Unscripted URLs answer 200 with their path as body.
#[derive(Debug, Default)]
pub(crate) struct FakeFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }

    pub(crate) fn respond(&self, url: &str, response: Response) {
        self.script(url, Script::Respond(response));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.script(url, Script::Fail);
    }

    /// Fetches of `url` never resolve.
    pub(crate) fn hang(&self, url: &str) {
        self.script(url, Script::Hang);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());
        let script = self.scripts.lock().unwrap().get(&url).cloned();

        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Fail) => Err(Error::Network(format!("{url}: connection refused"))),
            Some(Script::Hang) => std::future::pending().await,
            None => Ok(ok_response(request.url.path())),
        }
    }
}

/// Memory store that counts writes and reads.
#[derive(Debug, Default)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    puts: AtomicUsize,
    lookups: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.inner.open(partition).await
    }

    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(partition, request, response).await
    }

    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(partition, request).await
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        self.inner.delete(partition, key).await
    }

    async fn entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        self.inner.entries(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.inner.partitions().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        self.inner.delete_partition(partition).await
    }
}

/// Store whose every operation fails.
#[derive(Debug, Default)]
pub(crate) struct BrokenStore;

fn broken() -> Error {
    Error::CorruptEntry("disk on fire".into())
}

#[async_trait]
impl CacheStore for BrokenStore {
    async fn open(&self, _partition: &str) -> Result<(), Error> {
        Err(broken())
    }

    async fn put(&self, _partition: &str, _request: &Request, _response: &Response) -> Result<(), Error> {
        Err(broken())
    }

    async fn lookup(&self, _partition: &str, _request: &Request) -> Result<Option<Response>, Error> {
        Err(broken())
    }

    async fn delete(&self, _partition: &str, _key: &str) -> Result<bool, Error> {
        Err(broken())
    }

    async fn entries(&self, _partition: &str) -> Result<Vec<EntryMeta>, Error> {
        Err(broken())
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        Err(broken())
    }

    async fn delete_partition(&self, _partition: &str) -> Result<bool, Error> {
        Err(broken())
    }
}

/// Memory store that refuses to delete one partition.
#[derive(Debug)]
pub(crate) struct RefusingStore {
    inner: MemoryStore,
    keep: String,
}

impl RefusingStore {
    pub(crate) fn new(keep: &str) -> Self {
        Self { inner: MemoryStore::new(), keep: keep.to_string() }
    }

    /// Handle on the underlying partitions.
    pub(crate) fn inner(&self) -> MemoryStore {
        self.inner.clone()
    }
}

#[async_trait]
impl CacheStore for RefusingStore {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.inner.open(partition).await
    }

    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.inner.put(partition, request, response).await
    }

    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.lookup(partition, request).await
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        self.inner.delete(partition, key).await
    }

    async fn entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        self.inner.entries(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.inner.partitions().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        if partition == self.keep {
            return Err(broken());
        }
        self.inner.delete_partition(partition).await
    }
}
