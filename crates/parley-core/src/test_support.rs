//! Scripted assistant transport for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::services::{AssistantClient, AssistantRequest, RequestError};

/// One scripted outcome
#[derive(Clone, Debug)]
pub enum MockReply {
    Reply(String),
    Fail(RequestError),
    /// Wait until the request is cancelled
    Hang,
}

/// Replays scripted outcomes in order and records every request.
///
/// An exhausted script answers with `InvalidResponse`. Clones share the
/// script and the request log.
#[derive(Clone, Default)]
pub struct MockAssistantClient {
    script: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<AssistantRequest>>>,
}

impl MockAssistantClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(reply: impl Into<String>) -> Self {
        let client = Self::new();
        client.push_reply(reply);
        client
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.script.lock().push_back(MockReply::Reply(reply.into()));
    }

    pub fn push_failure(&self, error: RequestError) {
        self.script.lock().push_back(MockReply::Fail(error));
    }

    pub fn push_hang(&self) {
        self.script.lock().push_back(MockReply::Hang);
    }

    pub fn requests(&self) -> Vec<AssistantRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AssistantClient for MockAssistantClient {
    async fn send(
        &self,
        request: &AssistantRequest,
        cancel: CancellationToken,
    ) -> Result<String, RequestError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();

        let result = match next {
            Some(MockReply::Reply(reply)) => Ok(reply),
            Some(MockReply::Fail(error)) => Err(error),
            Some(MockReply::Hang) => {
                cancel.cancelled().await;
                Err(RequestError::Cancelled)
            }
            None => Err(RequestError::InvalidResponse(
                "no scripted reply".to_string(),
            )),
        };

        // Cancellation wins over whatever was scripted
        if cancel.is_cancelled() {
            return Err(RequestError::Cancelled);
        }
        result
    }
}
