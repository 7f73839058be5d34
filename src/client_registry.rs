use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use log::debug;
use crate::services::chat_service::ChatController;

pub type SharedController = Arc<tokio::sync::Mutex<ChatController>>;

struct Entry {
    controller: SharedController,
    last_used: Instant,
}

/// Holds each browser's chat controller for the lifetime of its page.
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<Mutex<HashMap<String, Entry>>>,
    idle_timeout: Duration,
}

impl ClientRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        ClientRegistry {
            clients: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Returns the controller for `client_key`, creating it with `create` when absent.
    pub fn get_or_insert_with<F>(&self, client_key: &str, create: F) -> SharedController
    where
        F: FnOnce() -> ChatController,
    {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_idle(&mut clients);
        let entry = clients.entry(client_key.to_string()).or_insert_with(|| Entry {
            controller: Arc::new(tokio::sync::Mutex::new(create())),
            last_used: Instant::now(),
        });
        entry.last_used = Instant::now();
        entry.controller.clone()
    }

    /// Inserts or replaces the controller, as happens on every page load.
    pub fn replace(&self, client_key: &str, controller: ChatController) -> SharedController {
        let shared = Arc::new(tokio::sync::Mutex::new(controller));
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_idle(&mut clients);
        clients.insert(
            client_key.to_string(),
            Entry {
                controller: shared.clone(),
                last_used: Instant::now(),
            },
        );
        shared
    }

    pub fn remove(&self, client_key: &str) {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.remove(client_key);
    }

    pub fn len(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_idle(&self, clients: &mut HashMap<String, Entry>) {
        let before = clients.len();
        let idle_timeout = self.idle_timeout;
        clients.retain(|_, entry| entry.last_used.elapsed() < idle_timeout);
        if clients.len() != before {
            debug!("Evicted {} idle chat clients", before - clients.len());
        }
    }
}
