use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::models::{
    Chat, ChatId, ChatsStore, Message, MessageId, MessagePatch, Notification, NotificationQueue,
    RequestManager, RequestStatus, RequestTicket, Role, Settlement, SidebarState, Theme,
    derive_title,
};
use crate::repositories::{ChatStateRepository, IntegrationSettings};
use crate::services::{AssistantClient, AssistantRequest, RequestError};

const MAX_NOTIFICATIONS: usize = 50;

/// A request the front end must run against the assistant transport.
///
/// Feed the outcome back through [`ConversationController::complete_request`]
/// with `ticket.id()`.
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
    pub ticket: RequestTicket,
    pub payload: AssistantRequest,
}

/// Transport outcome for one ticket
#[derive(Debug)]
pub struct Completion {
    pub ticket_id: u64,
    pub result: Result<String, RequestError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RequestOrigin {
    Send,
    Retry,
}

/// Owns the chat collection, the request slot and write-through persistence.
///
/// Every method is synchronous. The assistant call is the only suspension
/// point and is driven by the caller: `send_message` and `retry_last_message`
/// hand back an [`OutgoingRequest`], and the result comes back through
/// `complete_request`.
pub struct ConversationController {
    chats: ChatsStore,
    requests: RequestManager,
    origin: Option<(u64, RequestOrigin)>,
    repository: ChatStateRepository,
    theme: Theme,
    sidebar: SidebarState,
    notifications: NotificationQueue,
}

impl ConversationController {
    /// Restore persisted state and select the first chat
    pub fn load(repository: ChatStateRepository) -> Self {
        let state = repository.load();
        info!(
            storage = %repository.storage_path(),
            chats = state.chats.len(),
            "Conversation state restored"
        );

        Self {
            chats: ChatsStore::from_chats(state.chats),
            requests: RequestManager::new(),
            origin: None,
            repository,
            theme: state.theme,
            sidebar: state.sidebar,
            notifications: NotificationQueue::new(MAX_NOTIFICATIONS),
        }
    }

    // Read access

    /// Immutable snapshot of all chats, most recent first
    pub fn chats(&self) -> Arc<[Chat]> {
        self.chats.snapshot()
    }

    /// Bumped on every change to the chat collection or selection
    pub fn revision(&self) -> u64 {
        self.chats.revision()
    }

    pub fn current_chat_id(&self) -> Option<&ChatId> {
        self.chats.current_id()
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.chats.current()
    }

    pub fn chat(&self, id: &ChatId) -> Option<&Chat> {
        self.chats.get(id)
    }

    pub fn request_status(&self) -> &RequestStatus {
        self.requests.status()
    }

    pub fn is_loading(&self) -> bool {
        self.requests.is_pending()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn sidebar(&self) -> SidebarState {
        self.sidebar
    }

    /// Take all queued notifications, oldest first
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    // Chat collection

    pub fn create_new_chat(&mut self) -> ChatId {
        let chat = Chat::new();
        let id = chat.id.clone();
        self.chats.prepend(chat);
        self.chats.set_current(&id);
        self.persist_chats();
        debug!(chat_id = %id, "Created chat");
        id
    }

    pub fn delete_all_chats(&mut self) {
        self.cancel_pending();
        self.chats.clear();
        self.repository.clear_chats();
        self.notify(Notification::success("All chats cleared!"));
        info!("All chats cleared");
    }

    /// Switch to `id`. Unknown ids are ignored.
    pub fn select_chat(&mut self, id: &ChatId) -> bool {
        if !self.chats.contains(id) {
            debug!(chat_id = %id, "Ignoring selection of unknown chat");
            return false;
        }
        self.cancel_pending();
        self.chats.set_current(id)
    }

    // Request lifecycle

    /// Append a user message and start a request for it.
    ///
    /// Returns `None` without touching state when `text` is blank or a
    /// request is already pending.
    pub fn send_message(&mut self, text: &str) -> Option<OutgoingRequest> {
        if text.trim().is_empty() {
            return None;
        }
        if self.requests.is_pending() {
            debug!("Rejecting send while a request is pending");
            return None;
        }

        let chat = match self.chats.current() {
            Some(chat) => chat.clone(),
            None => {
                let chat = Chat::new();
                self.chats.prepend(chat.clone());
                self.chats.set_current(&chat.id);
                chat
            }
        };

        let mut next = chat.append_message(Message::user(text));
        if chat.is_empty() {
            next = next.with_title(derive_title(text));
        }
        self.chats.replace(next.clone());
        self.persist_chats();

        let payload = AssistantRequest::new(text, &next.messages);
        Some(self.begin_request(next.id, payload, RequestOrigin::Send))
    }

    /// Re-issue the last user message of the current chat.
    ///
    /// A trailing assistant message (usually the error) is removed first.
    /// Requires at least two messages and a user message.
    pub fn retry_last_message(&mut self) -> Option<OutgoingRequest> {
        let chat = self.chats.current()?;
        if chat.messages.len() < 2 {
            return None;
        }
        let last_user = chat.last_user_message()?.content.clone();

        let next = match chat.last_message() {
            Some(last) if last.role == Role::Assistant => chat.remove_last_message(),
            _ => chat.clone(),
        };
        self.chats.replace(next.clone());
        self.persist_chats();

        // The retried message is already part of the remaining history
        let payload = AssistantRequest::new(last_user, &next.messages);
        Some(self.begin_request(next.id, payload, RequestOrigin::Retry))
    }

    /// Stop the pending request. Returns whether one was pending.
    pub fn cancel_request(&mut self) -> bool {
        self.cancel_pending()
    }

    /// Apply a transport result to the chat the request was issued for.
    ///
    /// Cancelled and superseded tickets change nothing.
    pub fn complete_request(
        &mut self,
        ticket_id: u64,
        result: Result<String, RequestError>,
    ) -> Settlement {
        let chat_id = self.requests.pending_chat_id().cloned();
        let settlement = self.requests.finish(ticket_id, &result);
        let origin = match self.origin {
            Some((id, origin)) if id == ticket_id => {
                self.origin = None;
                origin
            }
            _ => RequestOrigin::Send,
        };

        let (Some(chat_id), Settlement::Resolved | Settlement::Failed) = (chat_id, settlement)
        else {
            return settlement;
        };

        let Some(chat) = self.chats.get(&chat_id).cloned() else {
            debug!(chat_id = %chat_id, "Chat vanished before its reply arrived");
            return settlement;
        };

        match result {
            Ok(reply) => {
                self.chats
                    .replace(chat.append_message(Message::assistant(reply)));
                self.notify(Notification::success("Response received!"));
            }
            Err(e) => {
                let reason = e.to_string();
                self.chats
                    .replace(chat.append_message(Message::assistant_error(&reason)));
                let text = match origin {
                    RequestOrigin::Send => format!("Failed to get response: {reason}"),
                    RequestOrigin::Retry => format!("Retry failed: {reason}"),
                };
                self.notify(Notification::error(text));
            }
        }
        self.persist_chats();
        settlement
    }

    /// Run `outgoing` against `client` without touching the controller
    pub async fn execute(client: &dyn AssistantClient, outgoing: OutgoingRequest) -> Completion {
        let result = client
            .send(&outgoing.payload, outgoing.ticket.token())
            .await;
        Completion {
            ticket_id: outgoing.ticket.id(),
            result,
        }
    }

    /// Await the transport and settle the result
    pub async fn dispatch(
        &mut self,
        client: &dyn AssistantClient,
        outgoing: OutgoingRequest,
    ) -> Settlement {
        let completion = Self::execute(client, outgoing).await;
        self.complete_request(completion.ticket_id, completion.result)
    }

    // Message actions

    /// Replace the content of a user message in the current chat.
    /// Blank text, unknown ids and assistant messages are ignored.
    pub fn edit_message(&mut self, id: &MessageId, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(chat) = self.chats.current() else {
            return false;
        };
        if !chat.message(id).is_some_and(|m| m.role == Role::User) {
            return false;
        }

        let next = chat.update_message(id, &MessagePatch::content(text));
        self.chats.replace(next);
        self.persist_chats();
        self.notify(Notification::success("Message updated!"));
        true
    }

    pub fn like_message(&mut self, id: &MessageId) -> bool {
        self.record_feedback(id, MessagePatch::toggle_like)
    }

    pub fn dislike_message(&mut self, id: &MessageId) -> bool {
        self.record_feedback(id, MessagePatch::toggle_dislike)
    }

    fn record_feedback(&mut self, id: &MessageId, patch: fn(&Message) -> MessagePatch) -> bool {
        let Some(chat) = self.chats.current() else {
            return false;
        };
        let Some(message) = chat.message(id).filter(|m| m.role == Role::Assistant) else {
            return false;
        };

        let next = chat.update_message(id, &patch(message));
        self.chats.replace(next);
        self.persist_chats();
        self.notify(Notification::success("Feedback recorded!"));
        true
    }

    /// Content of a message in any chat, for the copy action
    pub fn message_text(&self, id: &MessageId) -> Option<String> {
        self.find_message(id).map(|m| m.content.clone())
    }

    /// Public link for a message: `<base>/share/<id>`
    pub fn share_link(&self, base_url: &str, id: &MessageId) -> Option<String> {
        self.find_message(id)?;
        Some(format!("{}/share/{}", base_url.trim_end_matches('/'), id))
    }

    /// Write a message as `message-<first 8 chars of id>.md` inside `dir`
    pub fn export_message(&mut self, id: &MessageId, dir: &Path) -> Result<PathBuf, CoreError> {
        let result = self.write_export(id, dir);
        match &result {
            Ok(path) => {
                debug!(path = %path.display(), "Exported message");
                self.notify(Notification::success("Message downloaded as markdown!"));
            }
            Err(e) => {
                warn!(message_id = %id, error = ?e, "Failed to export message");
                self.notify(Notification::error("Failed to download message"));
            }
        }
        result
    }

    fn write_export(&self, id: &MessageId, dir: &Path) -> Result<PathBuf, CoreError> {
        let message = self
            .find_message(id)
            .ok_or_else(|| CoreError::MessageNotFound(id.to_string()))?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("message-{}.md", id.short()));
        std::fs::write(&path, &message.content)?;
        Ok(path)
    }

    fn find_message(&self, id: &MessageId) -> Option<&Message> {
        self.chats.chats().iter().find_map(|c| c.message(id))
    }

    // Preferences

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.repository.save_theme(self.theme);
        self.theme
    }

    pub fn toggle_sidebar(&mut self) -> SidebarState {
        self.sidebar = self.sidebar.toggled();
        self.repository.save_sidebar(self.sidebar);
        self.sidebar
    }

    pub fn integration_settings(&self) -> IntegrationSettings {
        self.repository.load_integration_settings()
    }

    /// Overwrite both settings blobs wholesale
    pub fn save_integration_settings(&mut self, settings: &IntegrationSettings) -> bool {
        let confluence = self
            .repository
            .save_confluence_settings(&settings.confluence);
        let svportal = self.repository.save_svportal_settings(&settings.svportal);
        confluence && svportal
    }

    // Internals

    fn begin_request(
        &mut self,
        chat_id: ChatId,
        payload: AssistantRequest,
        origin: RequestOrigin,
    ) -> OutgoingRequest {
        let ticket = self.requests.begin(chat_id);
        self.origin = Some((ticket.id(), origin));
        OutgoingRequest { ticket, payload }
    }

    fn cancel_pending(&mut self) -> bool {
        self.origin = None;
        self.requests.cancel()
    }

    fn persist_chats(&mut self) {
        let snapshot = self.chats.snapshot();
        if !self.repository.save_chats(&snapshot) {
            warn!(
                chats = snapshot.len(),
                "Chats not persisted, continuing with in-memory state"
            );
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}
