use std::sync::Arc;
use log::{info, warn, error};
use crate::models::chat_message::{ChatMessage, Role, Transcript};
use crate::models::client_state::ClientState;
use crate::models::client_storage::{ClientStorage, StorageError};
use crate::models::language::Phrase;
use crate::services::render_service::Renderer;
use crate::services::transport_service::ChatTransport;

/// Drives one browser's transcript: sending, history restore and reset.
///
/// Input is disabled for the whole of a send. Callers hold the controller behind
/// a lock for that duration, so a second send cannot begin before the first ends.
pub struct ChatController {
    transport: Arc<dyn ChatTransport>,
    renderer: Renderer,
    history_turns: Option<u32>,
    transcript: Transcript,
    input_enabled: bool,
}

impl ChatController {
    pub fn new(transport: Arc<dyn ChatTransport>, renderer: Renderer, history_turns: Option<u32>) -> Self {
        ChatController {
            transport,
            renderer,
            history_turns,
            transcript: Transcript::default(),
            input_enabled: true,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Populates a fresh transcript on entry to the chat screen: prior turns when
    /// history restore is configured and yields something, otherwise the welcome.
    pub async fn enter_logged_in(&mut self, state: &ClientState) -> &[ChatMessage] {
        self.transcript.clear();
        self.input_enabled = true;

        let history = match (self.history_turns, state.valid_user()) {
            (Some(turns), Some(user)) => {
                match self.transport.fetch_history(&user.access_token, state.session_id.as_str(), turns).await {
                    Ok(turns) => turns,
                    Err(e) => {
                        warn!("History unavailable for session {}: {}", state.session_id, e);
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        };

        if history.is_empty() {
            self.append_system(state, Phrase::Welcome);
        } else {
            info!("Restored {} turns for session {}", history.len(), state.session_id);
            for turn in history {
                let message = self.renderer.render(&turn.content, turn.role);
                self.transcript.push(message);
            }
        }
        self.transcript.messages()
    }

    /// Sends one user message and returns the entries appended to the transcript.
    pub async fn send_message(&mut self, state: &ClientState, text: &str) -> Vec<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let Some(user) = state.valid_user() else {
            info!("Send attempted without a valid session");
            return vec![self.append_system(state, Phrase::SignInRequired)];
        };

        self.input_enabled = false;
        let mut appended = vec![self.append(text, Role::User)];

        let result = self
            .transport
            .send_message(&user.access_token, state.session_id.as_str(), text)
            .await;

        match result {
            Ok(reply) => appended.push(self.append(&reply, Role::Assistant)),
            Err(e) => {
                error!("Error sending message for session {}: {}", state.session_id, e);
                appended.push(self.append_system(state, Phrase::SendFailed));
            }
        }

        self.input_enabled = true;
        appended
    }

    /// Starts a new conversation: clears the transcript and issues a fresh session id.
    pub fn reset_session(
        &mut self,
        state: &mut ClientState,
        storage: &dyn ClientStorage,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        state.regenerate_session_id(storage)?;
        self.transcript.clear();
        Ok(vec![self.append_system(state, Phrase::ConversationReset)])
    }

    fn append(&mut self, text: &str, role: Role) -> ChatMessage {
        let message = self.renderer.render(text, role);
        self.transcript.push(message.clone());
        message
    }

    fn append_system(&mut self, state: &ClientState, phrase: Phrase) -> ChatMessage {
        self.append(state.language.phrase(phrase), Role::System)
    }
}
