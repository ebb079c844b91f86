//! The service worker: one dispatcher, one partition set, one lifecycle.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use sp1sh_client::Fetcher;
use sp1sh_core::{AppConfig, CacheStore, Error, Request};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::classify::Classifier;
use crate::clients::{Client, Clients};
use crate::janitor::{Janitor, SweepReport};
use crate::lifecycle::WorkerState;
use crate::message::{ClearCacheAck, Command, ReplyPort};
use crate::names::CacheNames;
use crate::strategy::{Dispatcher, FetchResult};

pub struct ServiceWorker {
    pub(crate) names: CacheNames,
    pub(crate) origin: Url,
    pub(crate) manifest: Vec<String>,
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) clients: Clients,
    pub(crate) state: watch::Sender<WorkerState>,
    pub(crate) skip_waiting: AtomicBool,
    dispatcher: Dispatcher,
    janitor: Arc<Janitor>,
    janitor_interval: Duration,
}

impl ServiceWorker {
    /// Build a worker in the `Parsed` state. Nothing touches the store or
    /// the network until [`ServiceWorker::install`].
    pub fn new(config: &AppConfig, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let offline_url = origin
            .join(&config.offline_route)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.offline_route, e)))?;

        let names = CacheNames::new(&config.cache_version);
        let classifier = Classifier::new(origin.clone(), config.static_prefixes.clone());
        let dispatcher =
            Dispatcher::new(classifier, names.clone(), offline_url, Arc::clone(&store), Arc::clone(&fetcher));
        let max_age = config.max_entry_age().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let janitor = Arc::new(Janitor::new(Arc::clone(&store), names.clone(), max_age));
        let (state, _) = watch::channel(WorkerState::Parsed);

        Ok(Self {
            names,
            origin,
            manifest: config.precache_manifest.clone(),
            store,
            fetcher,
            clients: Clients::new(),
            state,
            skip_waiting: AtomicBool::new(false),
            dispatcher,
            janitor,
            janitor_interval: config.janitor_interval(),
        })
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Register a page opened by a navigation. Pages opened while the
    /// worker is active start out controlled.
    pub async fn open_client(&self, id: &str, url: Url) -> Client {
        let controlled = self.state() == WorkerState::Activated;
        let client = self.clients.add(id, url, controlled).await;
        tracing::debug!(client = id, controlled, "page opened");
        client
    }

    /// Forget a closed page.
    pub async fn close_client(&self, id: &str) -> Option<Client> {
        let closed = self.clients.remove(id).await;
        if closed.is_some() {
            tracing::debug!(client = id, "page closed");
        }
        closed
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Answer an intercepted request. See [`Dispatcher::handle`].
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchResult, Error> {
        self.dispatcher.handle(request).await
    }

    /// Parse and deliver a raw page message.
    pub async fn post_message(&self, message: &serde_json::Value, reply: Option<ReplyPort>) -> Result<(), Error> {
        let command =
            Command::parse(message, reply).inspect_err(|err| tracing::warn!(error = %err, "rejected message"))?;
        self.handle_message(command).await
    }

    /// Deliver a validated command.
    pub async fn handle_message(&self, command: Command) -> Result<(), Error> {
        tracing::info!(command = command.name(), state = %self.state(), "message received");

        match command {
            Command::SkipWaiting => self.skip_waiting_now().await,
            Command::ClearCache { reply } => {
                let result = self.clear_all().await;
                if let Some(reply) = reply {
                    let ack = ClearCacheAck { success: result.is_ok() };
                    if reply.send(ack).is_err() {
                        tracing::debug!("clear-cache reply dropped by sender");
                    }
                }
                let deleted = result?;
                tracing::info!(deleted, "cleared all partitions");
                Ok(())
            }
        }
    }

    /// Delete every partition in the store, current version or not.
    async fn clear_all(&self) -> Result<usize, Error> {
        let mut deleted = 0;
        for partition in self.store.partitions().await? {
            if self.store.delete_partition(&partition).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Run the janitor once, now.
    pub async fn sweep(&self) -> Result<SweepReport, Error> {
        self.janitor.sweep().await
    }

    /// Start the periodic janitor. Failure is logged and the worker carries
    /// on without expiry.
    pub fn register_janitor(&self) -> Option<JoinHandle<()>> {
        match Arc::clone(&self.janitor).register(self.janitor_interval) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(error = %err, "periodic cleanup unavailable");
                None
            }
        }
    }
}
