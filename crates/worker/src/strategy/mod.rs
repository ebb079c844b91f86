//! Strategy dispatch.
//!
//! Each intercepted request runs exactly one strategy, chosen by its class:
//!
//! | Class | Strategy | Writes to |
//! |---|---|---|
//! | Api | network-first | runtime |
//! | StaticAsset | cache-first | static |
//! | Image | stale-while-revalidate | images |
//! | HtmlNavigation | network-first, offline fallback | precache |
//! | Other | stale-while-revalidate, 408 on total failure | runtime |
//!
//! Cache reads and writes never fail a request. A failed lookup is a miss
//! and a failed write is skipped, both with a warning.

mod cache_first;
mod navigation;
mod network_first;
mod revalidate;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sp1sh_client::Fetcher;
use sp1sh_core::{CacheStore, Error, Request, Response};
use tokio::task::JoinHandle;
use url::Url;

use crate::classify::{Classifier, RequestClass, Route};
use crate::names::CacheNames;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The precached offline page standing in for a failed navigation.
    OfflineFallback,
    /// Built locally because neither network nor cache could answer.
    Synthetic,
}

/// Background refresh started by a stale-while-revalidate strategy.
pub type Revalidation = JoinHandle<Result<Response, Error>>;

/// Outcome of [`Dispatcher::handle`].
#[derive(Debug)]
pub struct FetchResult {
    pub route: Route,
    pub source: ResponseSource,
    pub response: Response,
    /// Set when a stale response was served while the network fetch is
    /// still refreshing the partition. Dropping it detaches the task.
    pub revalidation: Option<Revalidation>,
}

/// A strategy's answer before the route is attached.
#[derive(Debug)]
pub(crate) struct Served {
    source: ResponseSource,
    response: Response,
    revalidation: Option<Revalidation>,
}

impl Served {
    fn network(response: Response) -> Self {
        Self { source: ResponseSource::Network, response, revalidation: None }
    }

    fn cache(response: Response) -> Self {
        Self { source: ResponseSource::Cache, response, revalidation: None }
    }

    fn synthetic(response: Response) -> Self {
        Self { source: ResponseSource::Synthetic, response, revalidation: None }
    }
}

/// Routes requests to caching strategies.
pub struct Dispatcher {
    classifier: Classifier,
    names: CacheNames,
    offline_url: Url,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl Dispatcher {
    pub fn new(
        classifier: Classifier, names: CacheNames, offline_url: Url, store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self { classifier, names, offline_url, store, fetcher }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Answer one request.
    ///
    /// # Errors
    ///
    /// Only passthrough requests can fail, with the network error they hit.
    /// Every intercepted request resolves to a response.
    pub async fn handle(&self, request: &Request) -> Result<FetchResult, Error> {
        let route = self.classifier.classify(request);

        let served = match route {
            Route::Passthrough => {
                tracing::trace!(method = %request.method, url = %request.url, "passthrough");
                Served::network(self.fetcher.fetch(request).await?)
            }
            Route::Intercept(RequestClass::Api) => self.network_first(request).await,
            Route::Intercept(RequestClass::StaticAsset) => self.cache_first(request).await,
            Route::Intercept(RequestClass::Image) => {
                self.stale_while_revalidate(request, self.names.images(), &[], image_unavailable)
                    .await
            }
            Route::Intercept(RequestClass::HtmlNavigation) => self.navigate(request).await,
            Route::Intercept(RequestClass::Other) => {
                let fallbacks = [self.names.precache()];
                self.stale_while_revalidate(request, self.names.runtime(), &fallbacks, request_timeout)
                    .await
            }
        };

        tracing::debug!(
            url = %request.url,
            route = ?route,
            source = ?served.source,
            status = served.response.status,
            "handled fetch"
        );

        Ok(FetchResult { route, source: served.source, response: served.response, revalidation: served.revalidation })
    }

    /// Lookup that treats store failures as a miss.
    async fn cached(&self, partition: &str, request: &Request) -> Option<Response> {
        match self.store.lookup(partition, request).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(partition, url = %request.url, error = %err, "cache lookup failed");
                None
            }
        }
    }

    /// Write that logs instead of failing.
    async fn remember(&self, partition: &str, request: &Request, response: &Response) {
        remember(self.store.as_ref(), partition, request, response).await;
    }
}

pub(crate) async fn remember(store: &dyn CacheStore, partition: &str, request: &Request, response: &Response) {
    if let Err(err) = store.put(partition, request, response).await {
        tracing::warn!(partition, url = %request.url, error = %err, "cache write failed");
    }
}

fn image_unavailable(err: &Error) -> Response {
    Response::synthetic(503, "Service Unavailable", "text/plain; charset=utf-8", format!("Image unavailable: {err}"))
}

fn request_timeout(_err: &Error) -> Response {
    Response::synthetic(408, "Request Timeout", "text/plain; charset=utf-8", "Network error")
}
