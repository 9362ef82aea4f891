use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::chat::ChatId;
use crate::services::RequestError;

/// Lifecycle of the assistant request slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Idle,
    Pending,
    Resolved,
    Cancelled,
    Failed(String),
}

/// How a completed request was applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The reply was accepted
    Resolved,
    /// The request failed; an error message was recorded
    Failed,
    /// The request was cancelled; nothing was recorded
    Cancelled,
    /// The ticket had already been superseded; the result was discarded
    Stale,
}

/// Handle for one issued request.
///
/// Cloning shares the cancellation token, so the transport task can observe
/// cancellation triggered from the owner.
#[derive(Clone, Debug)]
pub struct RequestTicket {
    id: u64,
    chat_id: ChatId,
    token: CancellationToken,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct PendingRequest {
    ticket: RequestTicket,
    started_at: Instant,
}

/// Owns the single in-flight assistant request.
///
/// Beginning a request while another is pending cancels the earlier one; the
/// earlier ticket is then stale and its completion is discarded by `finish`.
pub struct RequestManager {
    status: RequestStatus,
    pending: Option<PendingRequest>,
    next_id: u64,
}

impl RequestManager {
    pub fn new() -> Self {
        Self {
            status: RequestStatus::Idle,
            pending: None,
            next_id: 1,
        }
    }

    /// Enter `Pending` for `chat_id`, cancelling any request already in flight
    pub fn begin(&mut self, chat_id: ChatId) -> RequestTicket {
        if self.cancel() {
            debug!("Cancelled pending request before starting a new one");
        }

        let ticket = RequestTicket {
            id: self.next_id,
            chat_id,
            token: CancellationToken::new(),
        };
        self.next_id += 1;

        debug!(request_id = ticket.id, chat_id = %ticket.chat_id, "Request started");
        self.pending = Some(PendingRequest {
            ticket: ticket.clone(),
            started_at: Instant::now(),
        });
        self.status = RequestStatus::Pending;
        ticket
    }

    /// Cooperatively abort the pending request. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        pending.ticket.token.cancel();
        self.status = RequestStatus::Cancelled;
        debug!(
            request_id = pending.ticket.id,
            elapsed_ms = pending.started_at.elapsed().as_millis() as u64,
            "Request cancelled"
        );
        true
    }

    /// Settle the request identified by `ticket_id` with the transport result.
    ///
    /// Anything other than the currently pending ticket is stale. A pending
    /// ticket whose token already fired settles as cancelled even if the
    /// transport reported success.
    pub fn finish(&mut self, ticket_id: u64, result: &Result<String, RequestError>) -> Settlement {
        let is_current = self
            .pending
            .as_ref()
            .is_some_and(|p| p.ticket.id == ticket_id);
        if !is_current {
            debug!(request_id = ticket_id, "Discarding stale request result");
            return Settlement::Stale;
        }

        let Some(pending) = self.pending.take() else {
            return Settlement::Stale;
        };

        if pending.ticket.token.is_cancelled() {
            self.status = RequestStatus::Cancelled;
            return Settlement::Cancelled;
        }

        match result {
            Ok(_) => {
                self.status = RequestStatus::Resolved;
                debug!(
                    request_id = ticket_id,
                    elapsed_ms = pending.started_at.elapsed().as_millis() as u64,
                    "Request resolved"
                );
                Settlement::Resolved
            }
            Err(RequestError::Cancelled) => {
                self.status = RequestStatus::Cancelled;
                Settlement::Cancelled
            }
            Err(e) => {
                warn!(request_id = ticket_id, error = %e, "Request failed");
                self.status = RequestStatus::Failed(e.to_string());
                Settlement::Failed
            }
        }
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Chat the pending request belongs to
    pub fn pending_chat_id(&self) -> Option<&ChatId> {
        self.pending.as_ref().map(|p| &p.ticket.chat_id)
    }
}

impl Default for RequestManager {
    fn default() -> Self {
        Self::new()
    }
}
