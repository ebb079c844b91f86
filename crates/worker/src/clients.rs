//! Pages the worker can control.

use std::collections::HashMap;

use tokio::sync::RwLock;
use url::Url;

/// A registered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub url: Url,
    /// Whether this worker controls the page.
    pub controlled: bool,
}

/// Registry of open pages.
#[derive(Debug, Default)]
pub struct Clients {
    clients: RwLock<HashMap<String, Client>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page, replacing any page with the same id.
    pub async fn add(&self, id: impl Into<String>, url: Url, controlled: bool) -> Client {
        let id = id.into();
        let client = Client { id: id.clone(), url, controlled };
        self.clients.write().await.insert(id, client.clone());
        client
    }

    pub async fn remove(&self, id: &str) -> Option<Client> {
        self.clients.write().await.remove(id)
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    /// Take control of every registered page. Returns how many changed hands.
    pub async fn claim(&self) -> usize {
        let mut clients = self.clients.write().await;
        let mut claimed = 0;
        for client in clients.values_mut().filter(|c| !c.controlled) {
            client.controlled = true;
            claimed += 1;
        }
        claimed
    }

    pub async fn controlled(&self) -> usize {
        self.clients.read().await.values().filter(|c| c.controlled).count()
    }
}
