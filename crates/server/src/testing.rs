//! Test helpers: a worker wired to a scripted network.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use sp1sh_client::Fetcher;
use sp1sh_core::{AppConfig, Error, MemoryStore, Request, Response};
use sp1sh_worker::ServiceWorker;

/// Answers every URL with 200 and its path, except the ones told to fail.
struct StubFetcher {
    failing: HashSet<String>,
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.failing.contains(request.url.as_str()) {
            return Err(Error::Network(format!("{}: unreachable", request.url)));
        }
        Ok(Response::new(200, "OK")
            .with_header("content-type", "text/plain")
            .with_body(request.url.path()))
    }
}

pub(crate) fn worker(store: &MemoryStore) -> ServiceWorker {
    worker_with(store, &[])
}

pub(crate) fn worker_with(store: &MemoryStore, failing: &[&str]) -> ServiceWorker {
    let config = AppConfig { origin: "https://sp1sh.dev".into(), ..Default::default() };
    let fetcher = StubFetcher { failing: failing.iter().map(|u| u.to_string()).collect() };
    ServiceWorker::new(&config, Arc::new(store.clone()), Arc::new(fetcher)).unwrap()
}

/// Parse the JSON text of a tool result.
pub(crate) fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
