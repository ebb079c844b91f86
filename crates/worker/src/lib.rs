//! Service worker for the sp1sh site.
//!
//! Intercepts same-origin GET requests and answers them from versioned
//! cache partitions or the network, depending on the resource class.
//!
//! - [`classify`]: request to route
//! - [`strategy`]: network-first, cache-first and stale-while-revalidate
//! - [`lifecycle`]: install, activate and skip-waiting
//! - [`message`]: page-to-worker commands
//! - [`janitor`]: periodic expiry of old entries

pub mod classify;
pub mod clients;
pub mod janitor;
pub mod lifecycle;
pub mod message;
pub mod names;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{Classifier, RequestClass, Route};
pub use clients::{Client, Clients};
pub use janitor::{Janitor, SweepReport};
pub use lifecycle::{ActivateReport, InstallReport, WorkerState};
pub use message::{ClearCacheAck, Command, MessagePayload, ReplyPort};
pub use names::CacheNames;
pub use strategy::{Dispatcher, FetchResult, ResponseSource, Revalidation};
pub use worker::ServiceWorker;
