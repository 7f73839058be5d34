use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use crate::models::chat_message::Role;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Chat backend answered with status {0}")]
    Status(StatusCode),

    #[error("Request to chat backend failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Body(String),
}

/// One prior conversation turn as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    response: Option<String>,
}

#[derive(Serialize)]
struct HistoryRequest<'a> {
    action: &'static str,
    #[serde(rename = "sessionId")]
    session_id: &'a str,
    k: u32,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<HistoryTurn>,
}

/// The chat backend as seen by the client: one POST endpoint, bearer authenticated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends one user message and returns the assistant's reply text.
    async fn send_message(
        &self,
        access_token: &str,
        session_id: &str,
        message: &str,
    ) -> Result<String, TransportError>;

    /// Fetches the last `turns` turns of the conversation, oldest first.
    async fn fetch_history(
        &self,
        access_token: &str,
        session_id: &str,
        turns: u32,
    ) -> Result<Vec<HistoryTurn>, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpTransport {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        access_token: &str,
        body: &B,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            error!("Chat backend returned {}", response.status());
            Err(TransportError::Status(response.status()))
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_message(
        &self,
        access_token: &str,
        session_id: &str,
        message: &str,
    ) -> Result<String, TransportError> {
        info!("Sending message for session {}", session_id);
        debug!("Message body: {}", message);
        let response = self
            .post(access_token, &SendRequest { message, session_id })
            .await?;

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        body.response
            .ok_or_else(|| TransportError::Body("missing \"response\" field".to_string()))
    }

    async fn fetch_history(
        &self,
        access_token: &str,
        session_id: &str,
        turns: u32,
    ) -> Result<Vec<HistoryTurn>, TransportError> {
        info!("Fetching {} history turns for session {}", turns, session_id);
        let request = HistoryRequest {
            action: "getHistory",
            session_id,
            k: turns,
        };
        let response = self.post(access_token, &request).await?;

        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        debug!("Backend returned {} history turns", body.messages.len());
        Ok(body.messages)
    }
}
