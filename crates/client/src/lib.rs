//! Network client for the sp1sh cache worker.
//!
//! This crate provides the [`Fetcher`] seam the dispatcher talks to, an HTTP
//! implementation over reqwest, and URL resolution against the site origin.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, UrlError, media_type, resolve};
