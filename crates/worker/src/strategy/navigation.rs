//! Network-first for page navigations, falling back to the offline page.

use sp1sh_core::{Request, Response};

use super::{Dispatcher, ResponseSource, Served};

const OFFLINE_HTML: &str = "<!doctype html><html><head><meta charset=\"utf-8\"><title>Offline</title></head>\
<body><h1>You are offline</h1><p><a href=\"\">Retry</a></p></body></html>";

impl Dispatcher {
    /// Fetch the page and keep whatever came back in the precache partition.
    /// Offline, serve the cached page, then the precached offline page.
    pub(crate) async fn navigate(&self, request: &Request) -> Served {
        let partition = self.names.precache();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.remember(partition, request, &response).await;
                Served::network(response)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "navigation failed, trying precache");
                if let Some(cached) = self.cached(partition, request).await {
                    return Served::cache(cached);
                }

                let offline = Request::get(self.offline_url.clone());
                match self.cached(partition, &offline).await {
                    Some(page) => Served { source: ResponseSource::OfflineFallback, response: page, revalidation: None },
                    None => {
                        tracing::warn!(offline = %self.offline_url, "offline page missing from precache");
                        Served::synthetic(Response::synthetic(
                            503,
                            "Service Unavailable",
                            "text/html; charset=utf-8",
                            OFFLINE_HTML,
                        ))
                    }
                }
            }
        }
    }
}
