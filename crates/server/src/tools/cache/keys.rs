//! cache_keys tool implementation.
//!
//! Lists partitions, or the entries stored in one of them.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sp1sh_core::{EntryMeta, Error};
use sp1sh_worker::ServiceWorker;

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Partition to list entries for. Omit to summarize every partition.
    #[serde(default)]
    pub partition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: usize,
    /// Whether the partition belongs to the running cache version.
    pub current: bool,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub partitions: Vec<PartitionSummary>,
    /// Entries of the requested partition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryMeta>>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(worker: &ServiceWorker, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let store = worker.store();
    let names = store.partitions().await?;

    let selected: Vec<String> = match &params.partition {
        Some(wanted) if names.contains(wanted) => vec![wanted.clone()],
        Some(wanted) => return Err(Error::InvalidInput(format!("no such partition: {wanted}")).into()),
        None => names,
    };

    let mut partitions = Vec::with_capacity(selected.len());
    let mut entries = None;
    for name in selected {
        let listed = store.entries(&name).await?;
        partitions.push(PartitionSummary { entries: listed.len(), current: worker.names().contains(&name), name });
        if params.partition.is_some() {
            entries = Some(listed);
        }
    }

    json_result(&CacheKeysOutput { partitions, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{output_json, worker};
    use sp1sh_core::{CacheStore, MemoryStore, Request, Response};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let origin = url::Url::parse("https://sp1sh.dev").unwrap();
        for path in ["/api/a", "/api/b"] {
            let request = Request::get(origin.join(path).unwrap());
            store.put("sp1sh-runtime-v1.0.0", &request, &Response::new(200, "OK")).await.unwrap();
        }
        store.open("sp1sh-runtime-v0.9.0").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_keys_summarizes_partitions() {
        let store = seeded().await;
        let w = worker(&store);
        let output: CacheKeysOutput =
            serde_json::from_value(output_json(&keys_impl(&w, CacheKeysParams::default()).await.unwrap())).unwrap();

        assert_eq!(output.partitions.len(), 2);
        assert!(output.entries.is_none());
        let old = output.partitions.iter().find(|p| p.name == "sp1sh-runtime-v0.9.0").unwrap();
        assert!(!old.current);
        let runtime = output.partitions.iter().find(|p| p.name == "sp1sh-runtime-v1.0.0").unwrap();
        assert!(runtime.current);
        assert_eq!(runtime.entries, 2);
    }

    #[tokio::test]
    async fn test_keys_lists_one_partition() {
        let store = seeded().await;
        let w = worker(&store);
        let params = CacheKeysParams { partition: Some("sp1sh-runtime-v1.0.0".into()) };
        let output: CacheKeysOutput = serde_json::from_value(output_json(&keys_impl(&w, params).await.unwrap())).unwrap();

        let entries = output.entries.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.method == "GET" && e.status == 200));
    }

    #[tokio::test]
    async fn test_keys_unknown_partition() {
        let w = worker(&MemoryStore::new());
        let params = CacheKeysParams { partition: Some("sp1sh-nope".into()) };
        assert!(keys_impl(&w, params).await.is_err());
    }
}
