//! Open client pages and the generation controlling each.

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registry of client pages keyed by client id.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, Option<String>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an open page. A new page starts uncontrolled.
    pub async fn register(&self, id: &str) {
        self.clients.write().await.entry(id.to_string()).or_insert(None);
    }

    /// Take control of every open page; returns how many pages changed controller.
    pub async fn claim(&self, cache_name: &str) -> usize {
        let mut clients = self.clients.write().await;
        let mut claimed = 0;
        for controller in clients.values_mut() {
            if controller.as_deref() != Some(cache_name) {
                *controller = Some(cache_name.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    pub async fn controller_of(&self, id: &str) -> Option<String> {
        self.clients.read().await.get(id).cloned().flatten()
    }
}
