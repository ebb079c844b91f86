//! sw_fetch tool implementation.
//!
//! Runs one request through the worker's dispatcher, exactly as a page
//! request would be intercepted.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sp1sh_client::{media_type, resolve};
use sp1sh_core::{Error, Request};
use sp1sh_worker::{RequestClass, ResponseSource, Route, ServiceWorker};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the worker origin.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET passes through.
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Wait for a background revalidation to finish before returning.
    #[serde(default)]
    pub await_revalidation: bool,

    /// Page id for a navigation. The page is registered with the worker.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub route: Route,
    pub source: ResponseSource,
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    pub body_bytes: usize,
    /// A stale response was served and the network refresh was started.
    pub revalidating: bool,
    /// Status the refresh received, when awaited and completed.
    pub revalidated_status: Option<u16>,
    /// Whether the page opened by this navigation is controlled.
    pub client_controlled: Option<bool>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = resolve(&params.url, worker.origin()).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let mut request = Request::new(params.method.trim(), url);
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }

    let result = worker.handle_fetch(&request).await?;

    let client_controlled = match (&params.client_id, result.route) {
        (Some(id), Route::Intercept(RequestClass::HtmlNavigation)) => {
            Some(worker.open_client(id, request.url.clone()).await.controlled)
        }
        _ => None,
    };

    let revalidating = result.revalidation.is_some();
    let mut revalidated_status = None;
    if params.await_revalidation
        && let Some(task) = result.revalidation
    {
        match task.await {
            Ok(Ok(fresh)) => revalidated_status = Some(fresh.status),
            Ok(Err(err)) => tracing::debug!(url = %request.url, error = %err, "revalidation failed"),
            Err(err) => tracing::warn!(url = %request.url, error = %err, "revalidation task aborted"),
        }
    }

    let response = result.response;
    let output = SwFetchOutput {
        url: request.url.to_string(),
        route: result.route,
        source: result.source,
        status: response.status,
        status_text: response.status_text.clone(),
        content_type: media_type(&response).map(str::to_string),
        body_bytes: response.body.len(),
        body: String::from_utf8(response.body).ok(),
        headers: response.headers,
        revalidating,
        revalidated_status,
        client_controlled,
    };

    json_result(&output)
}
