//! In-process partition store.
//!
//! Uses a HashMap per partition behind a tokio RwLock, so each operation is
//! atomic with respect to every other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheStore, EntryMeta};
use crate::http::{Request, Response};
use crate::Error;

#[derive(Debug, Clone)]
struct StoredEntry {
    method: String,
    url: String,
    response: Response,
    cached_at: String,
}

type Partitions = HashMap<String, HashMap<String, StoredEntry>>;

/// Memory-backed [`CacheStore`]. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    partitions: Arc<RwLock<Partitions>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all partitions.
    pub async fn len(&self) -> usize {
        self.partitions.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        partitions.entry(partition.to_string()).or_default();
        Ok(())
    }

    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let entry = StoredEntry {
            method: request.method.clone(),
            url: request.url.to_string(),
            response: response.clone(),
            cached_at: chrono::Utc::now().to_rfc3339(),
        };
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(partition.to_string())
            .or_default()
            .insert(request.cache_key(), entry);
        Ok(())
    }

    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(partition)
            .and_then(|entries| entries.get(&request.cache_key()))
            .map(|entry| entry.response.clone()))
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        Ok(partitions
            .get_mut(partition)
            .is_some_and(|entries| entries.remove(key).is_some()))
    }

    async fn entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        let partitions = self.partitions.read().await;
        let Some(entries) = partitions.get(partition) else {
            return Ok(Vec::new());
        };

        let mut metas: Vec<EntryMeta> = entries
            .iter()
            .map(|(key, entry)| EntryMeta {
                key: key.clone(),
                method: entry.method.clone(),
                url: entry.url.clone(),
                status: entry.response.status,
                date: entry.response.header("date").map(str::to_string),
                cached_at: entry.cached_at.clone(),
            })
            .collect();
        metas.sort_by(|a, b| a.cached_at.cmp(&b.cached_at).then_with(|| a.key.cmp(&b.key)));
        Ok(metas)
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        let partitions = self.partitions.read().await;
        let mut names: Vec<String> = partitions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        Ok(partitions.remove(partition).is_some())
    }
}
