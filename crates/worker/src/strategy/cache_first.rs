//! Cache-first for fonts and optimized assets.

use sp1sh_core::{Request, Response};

use super::{Dispatcher, Served};

impl Dispatcher {
    /// Serve the static partition's copy when there is one. Otherwise fetch,
    /// keeping only ok responses.
    pub(crate) async fn cache_first(&self, request: &Request) -> Served {
        let partition = self.names.static_assets();

        if let Some(cached) = self.cached(partition, request).await {
            return Served::cache(cached);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.remember(partition, request, &response).await;
                } else {
                    tracing::debug!(url = %request.url, status = response.status, "not caching static asset");
                }
                Served::network(response)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "static asset unavailable");
                Served::synthetic(Response::synthetic(
                    503,
                    "Service Unavailable",
                    "text/plain; charset=utf-8",
                    format!("Asset unavailable: {err}"),
                ))
            }
        }
    }
}
