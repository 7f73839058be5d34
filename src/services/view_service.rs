use log::{info, warn};
use serde::Deserialize;
use crate::models::client_storage::ClientStorage;
use crate::services::auth_service::AuthAdapter;

/// Query parameters the identity provider appends when redirecting back.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    LoggedOut,
    LoggedIn { display_name: String },
}

impl ViewState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, ViewState::LoggedIn { .. })
    }
}

/// Decides which screen a page load shows. A pending authorization code is
/// exchanged first; failure of that exchange always lands on the login screen.
pub async fn resolve_initial_view(
    adapter: &AuthAdapter,
    storage: &dyn ClientStorage,
    params: &CallbackParams,
) -> ViewState {
    if let Some(error) = params.error.as_deref() {
        warn!("Identity provider returned error: {}", error);
        adapter.clear_pending(storage);
        return ViewState::LoggedOut;
    }

    if let Some(code) = params.code.as_deref() {
        return match adapter
            .complete_sign_in_callback(storage, code, params.state.as_deref())
            .await
        {
            Ok(user) => ViewState::LoggedIn {
                display_name: user.display_name().to_string(),
            },
            Err(e) => {
                warn!("Sign-in callback failed: {}", e);
                ViewState::LoggedOut
            }
        };
    }

    current_view(adapter, storage)
}

/// The screen for the cached session alone, without touching the provider.
pub fn current_view(adapter: &AuthAdapter, storage: &dyn ClientStorage) -> ViewState {
    match adapter.current_user(storage).filter(|user| user.is_valid()) {
        Some(user) => ViewState::LoggedIn {
            display_name: user.display_name().to_string(),
        },
        None => {
            info!("No valid session; showing login screen");
            ViewState::LoggedOut
        }
    }
}
