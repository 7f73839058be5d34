use std::collections::HashMap;
use std::sync::Mutex;
use actix_session::Session;
use log::warn;

pub const CLIENT_KEY: &str = "clientKey";
pub const SESSION_ID_KEY: &str = "sessionId";
pub const LANGUAGE_KEY: &str = "language";
pub const USER_KEY: &str = "user";
pub const OAUTH_STATE_KEY: &str = "oauth_state";
pub const PKCE_VERIFIER_KEY: &str = "pkce_verifier";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to write {key}: {reason}")]
    Write { key: String, reason: String },
}

/// Per-browser key/value storage. Values are plain strings, like `localStorage`.
pub trait ClientStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str);
    /// Drops every key.
    fn clear(&self);
}

impl ClientStorage for Session {
    fn get_item(&self, key: &str) -> Option<String> {
        match self.get::<String>(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unreadable session value {}: {}", key, e);
                self.remove(key);
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value.to_string()).map_err(|e| StorageError::Write {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn remove_item(&self, key: &str) {
        self.remove(key);
    }

    fn clear(&self) {
        self.purge();
    }
}

/// In-process storage, used where no cookie session exists (tests, tools).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClientStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
    }

    fn clear(&self) {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
