use log::{info, warn};
use uuid::Uuid;
use crate::models::authenticated_user::AuthenticatedUser;
use crate::models::client_storage::{
    ClientStorage, StorageError, CLIENT_KEY, LANGUAGE_KEY, SESSION_ID_KEY, USER_KEY,
};
use crate::models::language::Language;
use crate::models::session_id::SessionId;

/// Everything the client knows about one browser, loaded per request from its storage.
#[derive(Debug, Clone)]
pub struct ClientState {
    /// Stable key for this browser's in-memory chat controller.
    pub client_key: String,
    pub session_id: SessionId,
    pub language: Language,
    pub user: Option<AuthenticatedUser>,
}

impl ClientState {
    /// Loads the state, creating and persisting the client key and session id on first visit.
    pub fn load(storage: &dyn ClientStorage) -> Result<Self, StorageError> {
        let client_key = match storage.get_item(CLIENT_KEY) {
            Some(key) => key,
            None => {
                let key = Uuid::new_v4().to_string();
                storage.set_item(CLIENT_KEY, &key)?;
                key
            }
        };

        let session_id = match storage.get_item(SESSION_ID_KEY) {
            Some(id) => SessionId::from(id),
            None => {
                let id = SessionId::generate();
                storage.set_item(SESSION_ID_KEY, id.as_str())?;
                info!("Created session id {}", id);
                id
            }
        };

        let language: Language = storage
            .get_item(LANGUAGE_KEY)
            .and_then(|code| code.parse().ok())
            .unwrap_or_default();

        Ok(ClientState {
            client_key,
            session_id,
            language,
            user: load_user(storage),
        })
    }

    /// The user, if present and not expired.
    pub fn valid_user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref().filter(|user| user.is_valid())
    }

    pub fn regenerate_session_id(&mut self, storage: &dyn ClientStorage) -> Result<&SessionId, StorageError> {
        let previous = std::mem::replace(&mut self.session_id, SessionId::generate());
        storage.set_item(SESSION_ID_KEY, self.session_id.as_str())?;
        info!("Replaced session id {} with {}", previous, self.session_id);
        Ok(&self.session_id)
    }

    pub fn set_language(&mut self, storage: &dyn ClientStorage, language: Language) -> Result<(), StorageError> {
        storage.set_item(LANGUAGE_KEY, language.code())?;
        self.language = language;
        Ok(())
    }
}

pub(crate) fn load_user(storage: &dyn ClientStorage) -> Option<AuthenticatedUser> {
    let raw = storage.get_item(USER_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Dropping malformed cached user: {}", e);
            storage.remove_item(USER_KEY);
            None
        }
    }
}

pub(crate) fn store_user(storage: &dyn ClientStorage, user: &AuthenticatedUser) -> Result<(), StorageError> {
    let raw = serde_json::to_string(user).map_err(|e| StorageError::Write {
        key: USER_KEY.to_string(),
        reason: e.to_string(),
    })?;
    storage.set_item(USER_KEY, &raw)
}
