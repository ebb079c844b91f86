//! Cache partitions: named request-to-response stores.
//!
//! Two backends implement [`CacheStore`]:
//!
//! - [`CacheDb`]: SQLite with async access via tokio-rusqlite, WAL mode and
//!   schema migrations. Used for persistent runs.
//! - [`MemoryStore`]: an in-process map, used for ephemeral runs and tests.
//!
//! Entries are keyed by a SHA-256 of the request method and URL. Writing a
//! key replaces its whole value, so concurrent writers to the same key
//! resolve as last-write-wins.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStore;
pub use store::{CacheStore, EntryMeta};
