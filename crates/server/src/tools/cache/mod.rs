//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and sweeping the partitions.

pub mod keys;
pub mod sweep;

pub use keys::{CacheKeysParams, keys_impl};
pub use sweep::{CacheSweepParams, sweep_impl};
