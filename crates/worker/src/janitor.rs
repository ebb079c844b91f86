//! Periodic expiry of old cache entries.
//!
//! An entry's age comes from the `date` header of the stored response.
//! Entries without a parseable date are never expired. The static-asset
//! partition is exempt: fonts and optimized images are versioned by URL.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sp1sh_core::{CacheStore, Error};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::names::CacheNames;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct SweepReport {
    /// Partitions inspected.
    pub partitions: usize,
    /// Entries inspected.
    pub scanned: usize,
    pub deleted: usize,
    /// Entries kept because they carry no usable date.
    pub undated: usize,
}

pub struct Janitor {
    store: Arc<dyn CacheStore>,
    names: CacheNames,
    max_age: chrono::Duration,
}

impl Janitor {
    pub fn new(store: Arc<dyn CacheStore>, names: CacheNames, max_age: chrono::Duration) -> Self {
        Self { store, names, max_age }
    }

    pub fn max_age(&self) -> chrono::Duration {
        self.max_age
    }

    /// Sweep against the current time.
    pub async fn sweep(&self) -> Result<SweepReport, Error> {
        self.sweep_at(Utc::now()).await
    }

    /// Delete every entry whose age at `now` exceeds the maximum age.
    ///
    /// # Errors
    ///
    /// Fails on the first store error. Deletions already made stay made.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, Error> {
        let mut report = SweepReport::default();

        for partition in self.store.partitions().await? {
            if partition == self.names.static_assets() {
                continue;
            }
            report.partitions += 1;

            for entry in self.store.entries(&partition).await? {
                report.scanned += 1;
                let Some(date) = entry.date() else {
                    report.undated += 1;
                    continue;
                };

                if now.signed_duration_since(date) > self.max_age && self.store.delete(&partition, &entry.key).await? {
                    tracing::debug!(partition = %partition, url = %entry.url, %date, "expired entry");
                    report.deleted += 1;
                }
            }
        }

        Ok(report)
    }

    /// Sweep every `interval` on the current tokio runtime. The first sweep
    /// runs one full interval after registration.
    ///
    /// # Errors
    ///
    /// `PERIODIC_UNAVAILABLE` when called outside a runtime or with a zero
    /// interval.
    pub fn register(self: Arc<Self>, interval: Duration) -> Result<JoinHandle<()>, Error> {
        let handle = Handle::try_current().map_err(|e| Error::PeriodicUnavailable(e.to_string()))?;
        if interval.is_zero() {
            return Err(Error::PeriodicUnavailable("interval must be non-zero".into()));
        }

        tracing::info!(interval_secs = interval.as_secs(), max_age_days = self.max_age.num_days(), "janitor registered");

        Ok(handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.sweep().await {
                    Ok(report) => tracing::info!(
                        partitions = report.partitions,
                        scanned = report.scanned,
                        deleted = report.deleted,
                        "janitor sweep"
                    ),
                    Err(err) => tracing::warn!(error = %err, "janitor sweep failed"),
                }
            }
        }))
    }
}
