use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::message::{Message, MessageId, MessagePatch, Role};

/// Placeholder title for a chat that has no messages yet
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Number of characters of the first message kept in a derived title
pub const TITLE_MAX_CHARS: usize = 30;

/// Opaque chat identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ChatId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A titled, ordered conversation thread.
///
/// Mutation helpers take `&self` and return the updated chat, leaving the
/// receiver untouched so callers can keep the previous snapshot around.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new() -> Self {
        Self {
            id: ChatId::new(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn append_message(&self, message: Message) -> Chat {
        let mut next = self.clone();
        next.messages.push(message);
        next
    }

    /// Apply `patch` to the message with `id`. Unknown ids leave the chat unchanged.
    pub fn update_message(&self, id: &MessageId, patch: &MessagePatch) -> Chat {
        let mut next = self.clone();
        if let Some(message) = next.messages.iter_mut().find(|m| &m.id == id) {
            message.apply(patch);
        }
        next
    }

    /// Drop the final message. An empty chat is returned as is.
    pub fn remove_last_message(&self) -> Chat {
        let mut next = self.clone();
        next.messages.pop();
        next
    }

    /// Same chat with a new title
    pub fn with_title(&self, title: String) -> Chat {
        let mut next = self.clone();
        next.title = title;
        next
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

/// Title for a chat whose first message is `text`
pub fn derive_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chat_defaults() {
        let chat = Chat::new();
        assert_eq!(chat.title, DEFAULT_CHAT_TITLE);
        assert!(chat.is_empty());
        assert_ne!(Chat::new().id, chat.id);
    }

    #[test]
    fn test_append_leaves_original_untouched() {
        let chat = Chat::new();
        let next = chat.append_message(Message::user("hello"));
        assert!(chat.is_empty());
        assert_eq!(next.messages.len(), 1);
        assert_eq!(next.id, chat.id);
    }

    #[test]
    fn test_update_message_by_id() {
        let chat = Chat::new().append_message(Message::user("first"));
        let id = chat.messages[0].id.clone();
        let next = chat.update_message(&id, &MessagePatch::content("edited"));
        assert_eq!(next.messages[0].content, "edited");
        assert_eq!(chat.messages[0].content, "first");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let chat = Chat::new().append_message(Message::user("first"));
        let next = chat.update_message(&MessageId::from("missing"), &MessagePatch::content("x"));
        assert_eq!(next, chat);
    }

    #[test]
    fn test_remove_last_message() {
        let chat = Chat::new()
            .append_message(Message::user("q"))
            .append_message(Message::assistant_error("boom"));
        let next = chat.remove_last_message();
        assert_eq!(next.messages.len(), 1);
        assert_eq!(next.messages[0].role, Role::User);

        let empty = Chat::new();
        assert_eq!(empty.remove_last_message(), empty);
    }

    #[test]
    fn test_derive_title_short_text() {
        assert_eq!(derive_title("Hello"), "Hello");
        let exact = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&exact), exact);
    }

    #[test]
    fn test_derive_title_truncates_on_chars() {
        let long = "How do I write a parser in Rust for markdown?";
        assert_eq!(derive_title(long), "How do I write a parser in Rus...");

        let accented = "é".repeat(40);
        let title = derive_title(&accented);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn test_last_user_message() {
        let chat = Chat::new()
            .append_message(Message::user("one"))
            .append_message(Message::assistant("two"))
            .append_message(Message::user("three"))
            .append_message(Message::assistant_error("four"));
        assert_eq!(chat.last_user_message().unwrap().content, "three");
    }

    #[test]
    fn test_serialized_field_names() {
        let chat = Chat::new();
        let value = serde_json::to_value(&chat).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value["createdAt"].is_string());
    }
}
