//! Stale-while-revalidate for images and uncategorized resources.

use std::sync::Arc;

use sp1sh_core::{Error, Request, Response};

use super::{Dispatcher, Revalidation, Served, remember};

impl Dispatcher {
    /// Start the network fetch, then look in `partition` and `fallbacks`.
    ///
    /// A hit is served at once and the fetch keeps running in the background,
    /// writing whatever it receives into `partition`. A miss waits for the
    /// fetch; if that fails too, `on_failure` builds the answer.
    pub(crate) async fn stale_while_revalidate(
        &self, request: &Request, partition: &str, fallbacks: &[&str], on_failure: fn(&Error) -> Response,
    ) -> Served {
        let refresh = self.spawn_refresh(request, partition);

        for name in std::iter::once(partition).chain(fallbacks.iter().copied()) {
            if let Some(cached) = self.cached(name, request).await {
                tracing::debug!(url = %request.url, partition = name, "serving stale while revalidating");
                return Served { revalidation: Some(refresh), ..Served::cache(cached) };
            }
        }

        match refresh.await {
            Ok(Ok(response)) => Served::network(response),
            Ok(Err(err)) => {
                tracing::debug!(url = %request.url, error = %err, "no cached copy and network failed");
                Served::synthetic(on_failure(&err))
            }
            Err(join_err) => Served::synthetic(on_failure(&Error::Network(join_err.to_string()))),
        }
    }

    fn spawn_refresh(&self, request: &Request, partition: &str) -> Revalidation {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let request = request.clone();
        let partition = partition.to_string();

        tokio::spawn(async move {
            let response = fetcher.fetch(&request).await?;
            remember(store.as_ref(), &partition, &request, &response).await;
            Ok::<_, Error>(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sp1sh_core::{CacheStore, MemoryStore};

    use crate::strategy::ResponseSource;
    use crate::testing::{FakeFetcher, dispatcher, get, ok_response, url};

    const IMAGES: &str = "sp1sh-images-v1.0.0";
    const RUNTIME: &str = "sp1sh-runtime-v1.0.0";
    const PRECACHE: &str = "sp1sh-cache-v1.0.0";

    #[tokio::test]
    async fn test_warm_image_does_not_wait_for_network() {
        let store = MemoryStore::new();
        store.put(IMAGES, &get("/logo.png"), &ok_response("old-logo")).await.unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.hang(&url("/logo.png"));
        let d = dispatcher(&store, fetcher);

        let result = tokio::time::timeout(Duration::from_secs(1), d.handle(&get("/logo.png")))
            .await
            .expect("handle waited on the network")
            .unwrap();
        assert_eq!(result.source, ResponseSource::Cache);
        assert_eq!(result.response.body, b"old-logo");

        let refresh = result.revalidation.unwrap();
        assert!(!refresh.is_finished());
        refresh.abort();
    }

    #[tokio::test]
    async fn test_background_refresh_updates_partition() {
        let store = MemoryStore::new();
        store.put(IMAGES, &get("/logo.png"), &ok_response("old-logo")).await.unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.respond(&url("/logo.png"), ok_response("new-logo"));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/logo.png")).await.unwrap();
        assert_eq!(result.response.body, b"old-logo");

        let refreshed = result.revalidation.unwrap().await.unwrap().unwrap();
        assert_eq!(refreshed.body, b"new-logo");
        let stored = store.lookup(IMAGES, &get("/logo.png")).await.unwrap().unwrap();
        assert_eq!(stored.body, b"new-logo");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_copy() {
        let store = MemoryStore::new();
        store.put(IMAGES, &get("/logo.png"), &ok_response("old-logo")).await.unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.fail(&url("/logo.png"));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/logo.png")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Cache);
        assert!(result.revalidation.unwrap().await.unwrap().is_err());

        let stored = store.lookup(IMAGES, &get("/logo.png")).await.unwrap().unwrap();
        assert_eq!(stored.body, b"old-logo");
    }

    #[tokio::test]
    async fn test_cold_image_waits_for_network() {
        let store = MemoryStore::new();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.respond(&url("/hero.webp"), ok_response("hero"));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/hero.webp")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Network);
        assert!(result.revalidation.is_none());
        assert!(store.lookup(IMAGES, &get("/hero.webp")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cold_image_network_failure() {
        let store = MemoryStore::new();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.fail(&url("/hero.webp"));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/hero.webp")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Synthetic);
        assert_eq!(result.response.status, 503);
    }

    #[tokio::test]
    async fn test_cold_not_ok_is_stored() {
        let store = MemoryStore::new();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.respond(&url("/gone.png"), ok_response("").with_status(404));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/gone.png")).await.unwrap();
        assert_eq!(result.response.status, 404);
        let stored = store.lookup(IMAGES, &get("/gone.png")).await.unwrap().unwrap();
        assert_eq!(stored.status, 404);
    }

    #[tokio::test]
    async fn test_background_not_ok_replaces_stale_copy() {
        let store = MemoryStore::new();
        store.put(IMAGES, &get("/logo.png"), &ok_response("old")).await.unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.respond(&url("/logo.png"), ok_response("missing").with_status(404));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/logo.png")).await.unwrap();
        assert_eq!(result.response.status, 200);
        let refreshed = result.revalidation.unwrap().await.unwrap().unwrap();
        assert_eq!(refreshed.status, 404);

        let stored = store.lookup(IMAGES, &get("/logo.png")).await.unwrap().unwrap();
        assert_eq!(stored.status, 404);
    }

    #[tokio::test]
    async fn test_other_total_failure_is_408() {
        let store = MemoryStore::new();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.fail(&url("/_next/static/app.js"));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/_next/static/app.js")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Synthetic);
        assert_eq!(result.response.status, 408);
        assert_eq!(result.response.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(result.response.body, b"Network error");
    }

    #[tokio::test]
    async fn test_other_reads_precache_and_writes_runtime() {
        let store = MemoryStore::new();
        store.put(PRECACHE, &get("/favicon.ico"), &ok_response("icon-v1")).await.unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        fetcher.respond(&url("/favicon.ico"), ok_response("icon-v2"));
        let d = dispatcher(&store, fetcher);

        let result = d.handle(&get("/favicon.ico")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Cache);
        assert_eq!(result.response.body, b"icon-v1");
        result.revalidation.unwrap().await.unwrap().unwrap();

        let runtime = store.lookup(RUNTIME, &get("/favicon.ico")).await.unwrap().unwrap();
        assert_eq!(runtime.body, b"icon-v2");
        let precache = store.lookup(PRECACHE, &get("/favicon.ico")).await.unwrap().unwrap();
        assert_eq!(precache.body, b"icon-v1");
    }
}
