//! sw_message tool implementation.
//!
//! Delivers a page message to the worker and optionally waits for its reply.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sp1sh_worker::{ClearCacheAck, ServiceWorker, WorkerState};
use tokio::sync::oneshot;

use super::json_result;

/// Input parameters for sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message payload, e.g. `{"type": "CLEAR_CACHE"}`.
    pub message: serde_json::Value,

    /// Hand the worker a reply channel and wait for its answer.
    #[serde(default)]
    pub await_reply: bool,
}

/// Output structure for sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Lifecycle state after the message was handled.
    pub state: WorkerState,
    /// The worker's reply, for messages that answer.
    pub reply: Option<ClearCacheAck>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &ServiceWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let (port, reply) = if params.await_reply {
        let (tx, rx) = oneshot::channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    worker.post_message(&params.message, port).await?;

    // Commands without an answer drop the port, which closes the channel.
    let reply = match reply {
        Some(rx) => rx.await.ok(),
        None => None,
    };

    json_result(&SwMessageOutput { state: worker.state(), reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{output_json, worker};
    use serde_json::json;
    use sp1sh_core::{CacheStore, MemoryStore, Request, Response};

    #[tokio::test]
    async fn test_clear_cache_replies() {
        let store = MemoryStore::new();
        let w = worker(&store);
        let request = Request::get(w.origin().join("/").unwrap());
        store.put("sp1sh-cache-v1.0.0", &request, &Response::new(200, "OK")).await.unwrap();

        let params = SwMessageParams { message: json!({"type": "CLEAR_CACHE"}), await_reply: true };
        let output: SwMessageOutput = serde_json::from_value(output_json(&message_impl(&w, params).await.unwrap())).unwrap();

        assert_eq!(output.reply, Some(ClearCacheAck { success: true }));
        assert!(store.partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_waiting_has_no_reply() {
        let w = worker(&MemoryStore::new());
        w.install().await.unwrap();

        let params = SwMessageParams { message: json!({"type": "SKIP_WAITING"}), await_reply: true };
        let output: SwMessageOutput = serde_json::from_value(output_json(&message_impl(&w, params).await.unwrap())).unwrap();

        assert_eq!(output.state, WorkerState::Activated);
        assert!(output.reply.is_none());
    }

    #[tokio::test]
    async fn test_unknown_message_is_error() {
        let w = worker(&MemoryStore::new());
        let params = SwMessageParams { message: json!({"type": "NOPE"}), await_reply: false };
        let err = message_impl(&w, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
