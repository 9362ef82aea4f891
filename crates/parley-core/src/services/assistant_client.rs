use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::request_error::RequestError;
use crate::models::{Message, Role};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/assistant/reply";

/// One prior turn as seen by the endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body posted to the assistant endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
}

impl AssistantRequest {
    pub fn new(message: impl Into<String>, history: &[Message]) -> Self {
        Self {
            message: message.into(),
            history: history.iter().map(HistoryEntry::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AssistantResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Transport to the assistant endpoint.
///
/// Implementations must return `RequestError::Cancelled` once `cancel` has
/// fired, even if a reply arrived concurrently.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn send(
        &self,
        request: &AssistantRequest,
        cancel: CancellationToken,
    ) -> Result<String, RequestError>;
}

/// reqwest-backed client for `POST <endpoint>`
#[derive(Clone)]
pub struct HttpAssistantClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAssistantClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &AssistantRequest) -> Result<String, RequestError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status(status.as_u16()));
        }

        let body: AssistantResponse = response
            .json()
            .await
            .map_err(|e| RequestError::InvalidResponse(e.to_string()))?;

        if let Some(error) = body.error
            && !error.is_empty()
        {
            return Err(RequestError::Remote(error));
        }

        body.reply
            .ok_or_else(|| RequestError::InvalidResponse("missing `reply` field".to_string()))
    }
}

#[async_trait]
impl AssistantClient for HttpAssistantClient {
    async fn send(
        &self,
        request: &AssistantRequest,
        cancel: CancellationToken,
    ) -> Result<String, RequestError> {
        debug!(
            endpoint = %self.endpoint,
            history_len = request.history.len(),
            "Posting assistant request"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RequestError::Cancelled),
            result = self.post(request) => {
                if cancel.is_cancelled() {
                    Err(RequestError::Cancelled)
                } else {
                    result
                }
            }
        }
    }
}
