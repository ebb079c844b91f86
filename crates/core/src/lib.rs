//! Core types and shared functionality for the sp1sh cache worker.
//!
//! This crate provides:
//! - Request/response values
//! - Cache partition stores (SQLite and in-memory)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStore, EntryMeta, MemoryStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response};
