//! The partition store interface shared by every backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::http::{Request, Response, parse_http_date};
use crate::Error;

/// Summary of one stored entry, without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryMeta {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Raw `date` header of the stored response.
    pub date: Option<String>,
    /// RFC 3339 time the entry was written.
    pub cached_at: String,
}

impl EntryMeta {
    /// Parsed `date` header.
    pub fn date(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.date.as_deref().and_then(parse_http_date)
    }
}

/// A set of named cache partitions.
///
/// Implementations serialize operations on the same key; a `put` replaces
/// the previous value for that request atomically.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it doesn't exist.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Store `response` for `request`, creating the partition on demand.
    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Find the stored response for `request`.
    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Delete one entry by key. Returns whether it existed.
    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error>;

    /// List the entries of a partition. Empty if the partition doesn't exist.
    async fn entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error>;

    /// Names of every existing partition, sorted.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    /// Drop a partition and all of its entries. Returns whether it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool, Error>;
}
