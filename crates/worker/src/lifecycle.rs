//! Install and activation.
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |
//!               +-> Redundant
//! ```
//!
//! Install precaches the manifest all-or-nothing. Activation evicts every
//! partition that does not belong to the current version and then claims
//! all open pages.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde::{Deserialize, Serialize};
use sp1sh_core::{Error, Request, Response};
use tokio::task::JoinSet;

use crate::worker::ServiceWorker;

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Install failed. Terminal.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    /// Routes written to the precache partition.
    pub precached: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ActivateReport {
    /// Partitions deleted because they belong to another version.
    pub evicted: Vec<String>,
    /// Pages that came under control.
    pub claimed: usize,
}

impl ServiceWorker {
    /// Precache every manifest route.
    ///
    /// # Errors
    ///
    /// `INVALID_STATE` unless the worker is `Parsed`. `INSTALL_FAILED` when
    /// any route fails to fetch, answers with a non-2xx status, or cannot be
    /// written; the worker is then `Redundant` and the precache partition
    /// holds nothing from this attempt.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;
        tracing::info!(routes = self.manifest.len(), partition = self.names.precache(), "installing");

        match self.precache().await {
            Ok(precached) => {
                self.state.send_replace(WorkerState::Installed);
                self.skip_waiting();
                tracing::info!(precached, "installed");
                Ok(InstallReport { precached })
            }
            Err(err) => {
                self.state.send_replace(WorkerState::Redundant);
                tracing::error!(error = %err, "install failed");
                Err(match err {
                    Error::InstallFailed(_) => err,
                    other => Error::InstallFailed(other.to_string()),
                })
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let mut requests = Vec::with_capacity(self.manifest.len());
        for route in &self.manifest {
            let url = self
                .origin
                .join(route)
                .map_err(|e| Error::InvalidUrl(format!("{route}: {e}")))?;
            requests.push(Request::get(url));
        }

        let mut fetches = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            fetches.spawn(async move {
                let result = fetcher.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched: Vec<(usize, Request, Response)> = Vec::with_capacity(fetches.len());
        while let Some(joined) = fetches.join_next().await {
            let (index, request, result) = joined.map_err(|e| Error::InstallFailed(format!("precache task: {e}")))?;
            let response = result?;
            if !response.ok() {
                return Err(Error::InstallFailed(format!("{} answered {}", request.url, response.status)));
            }
            fetched.push((index, request, response));
        }
        fetched.sort_by_key(|(index, ..)| *index);

        let partition = self.names.precache();
        self.store.open(partition).await?;
        for (_, request, response) in &fetched {
            if let Err(err) = self.store.put(partition, request, response).await {
                if let Err(cleanup) = self.store.delete_partition(partition).await {
                    tracing::warn!(partition, error = %cleanup, "could not discard partial precache");
                }
                return Err(err);
            }
        }

        Ok(fetched.len())
    }

    /// Evict other versions' partitions and claim every page.
    ///
    /// Eviction failures are logged; activation still completes.
    ///
    /// # Errors
    ///
    /// `INVALID_STATE` unless the worker is `Installed`.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        let evicted = match self.evict_stale().await {
            Ok(evicted) => evicted,
            Err(err) => {
                tracing::warn!(error = %err, "stale partition eviction failed");
                Vec::new()
            }
        };
        let claimed = self.clients.claim().await;

        self.state.send_replace(WorkerState::Activated);
        tracing::info!(evicted = evicted.len(), claimed, "activated");
        Ok(ActivateReport { evicted, claimed })
    }

    /// A partition that fails to delete is logged and left for the next
    /// activation; the rest are still evicted.
    async fn evict_stale(&self) -> Result<Vec<String>, Error> {
        let mut evicted = Vec::new();
        for partition in self.store.partitions().await? {
            if self.names.contains(&partition) {
                continue;
            }
            match self.store.delete_partition(&partition).await {
                Ok(true) => {
                    tracing::debug!(partition = %partition, "evicted stale partition");
                    evicted.push(partition);
                }
                Ok(false) => {}
                Err(err) => tracing::warn!(partition = %partition, error = %err, "could not evict stale partition"),
            }
        }
        Ok(evicted)
    }

    /// Ask to activate without waiting for older workers to let go.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Request skip-waiting and activate immediately if installed.
    pub(crate) async fn skip_waiting_now(&self) -> Result<(), Error> {
        self.skip_waiting();
        if self.state() != WorkerState::Installed {
            return Ok(());
        }
        match self.activate().await {
            Ok(_) => Ok(()),
            // Another caller activated first.
            Err(Error::InvalidState(reason)) => {
                tracing::debug!(%reason, "skip waiting raced activation");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Install, then activate when skip-waiting was requested.
    pub async fn start(&self) -> Result<WorkerState, Error> {
        self.install().await?;
        if self.skip_waiting_requested() {
            self.activate().await?;
        }
        Ok(self.state())
    }

    /// Move `from -> to` atomically, or report the state actually found.
    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut found = from;
        let moved = self.state.send_if_modified(|state| {
            found = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });

        if moved {
            Ok(())
        } else {
            Err(Error::InvalidState(format!("cannot move to {to} from {found}, expected {from}")))
        }
    }
}
