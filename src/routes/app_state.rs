use std::sync::Arc;
use crate::client_registry::ClientRegistry;
use crate::config::AppConfig;
use crate::services::auth_service::{AuthAdapter, AuthError};
use crate::services::chat_service::ChatController;
use crate::services::render_service::Renderer;
use crate::services::transport_service::{ChatTransport, HttpTransport};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthAdapter>,
    pub transport: Arc<dyn ChatTransport>,
    pub renderer: Renderer,
    pub registry: ClientRegistry,
    pub history_turns: Option<u32>,
    pub static_dir: String,
}

impl AppState {
    /// Builds the shared state around an already constructed transport.
    pub fn new(config: &AppConfig, transport: Arc<dyn ChatTransport>) -> Result<Self, AuthError> {
        Ok(AppState {
            auth: Arc::new(AuthAdapter::new(&config.auth)?),
            transport,
            renderer: Renderer::new(config.chat.label_links),
            registry: ClientRegistry::new(config.server.client_idle_timeout),
            history_turns: config.chat.history_turns,
            static_dir: config.server.static_dir.clone(),
        })
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.chat.api_url, config.chat.request_timeout)?;
        Ok(AppState::new(config, Arc::new(transport))?)
    }

    pub fn new_controller(&self) -> ChatController {
        ChatController::new(self.transport.clone(), self.renderer, self.history_turns)
    }
}
