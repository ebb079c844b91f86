//! sw_close_page tool implementation.
//!
//! Tells the worker a page went away, so later claims skip it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sp1sh_core::Error;
use sp1sh_worker::ServiceWorker;

use super::json_result;

/// Input parameters for sw_close_page tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClosePageParams {
    /// Id the page was opened with through sw_fetch.
    pub client_id: String,
}

/// Output structure for sw_close_page tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClosePageOutput {
    /// False when no page had that id.
    pub closed: bool,
    /// Pages still under the worker's control.
    pub controlled: usize,
}

/// Implementation of the sw_close_page tool.
pub async fn close_impl(worker: &ServiceWorker, params: ClosePageParams) -> Result<CallToolResult, McpError> {
    if params.client_id.trim().is_empty() {
        return Err(Error::InvalidInput("client_id cannot be empty".into()).into());
    }

    let closed = worker.close_client(&params.client_id).await.is_some();
    let controlled = worker.clients().controlled().await;

    json_result(&ClosePageOutput { closed, controlled })
}
