//! Network-first for API calls.

use serde_json::json;
use sp1sh_core::{Error, Request, Response};

use super::{Dispatcher, Served};

impl Dispatcher {
    /// Try the network and keep a copy of every 200 in the runtime partition.
    /// When the network is down, serve the last copy; with no copy, answer
    /// with a 503 JSON error.
    pub(crate) async fn network_first(&self, request: &Request) -> Served {
        let partition = self.names.runtime();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.remember(partition, request, &response).await;
                }
                Served::network(response)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "api fetch failed, trying runtime cache");
                match self.cached(partition, request).await {
                    Some(cached) => Served::cache(cached),
                    None => Served::synthetic(api_unavailable(request, &err)),
                }
            }
        }
    }
}

fn api_unavailable(request: &Request, err: &Error) -> Response {
    let body = json!({
        "error": "NETWORK_UNAVAILABLE",
        "message": err.to_string(),
        "url": request.url.as_str(),
    });
    Response::synthetic(503, "Service Unavailable", "application/json", body.to_string())
}
