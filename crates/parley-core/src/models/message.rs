use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque message identifier (UUID v4 string, never reused)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used for export file names
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn in a chat
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disliked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
            liked: None,
            disliked: None,
            error: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Synthetic assistant message standing in for a failed request
    pub fn assistant_error(reason: &str) -> Self {
        let mut message = Self::new(Role::Assistant, format_error_body(reason));
        message.error = Some(true);
        message
    }

    pub fn is_liked(&self) -> bool {
        self.liked.unwrap_or(false)
    }

    pub fn is_disliked(&self) -> bool {
        self.disliked.unwrap_or(false)
    }

    pub fn is_error(&self) -> bool {
        self.error.unwrap_or(false)
    }

    /// Apply a patch in place. Setting one feedback flag to true clears the other.
    pub fn apply(&mut self, patch: &MessagePatch) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(liked) = patch.liked {
            self.liked = Some(liked);
            if liked {
                self.disliked = Some(false);
            }
        }
        if let Some(disliked) = patch.disliked {
            self.disliked = Some(disliked);
            if disliked {
                self.liked = Some(false);
            }
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
    }
}

/// Markdown body of a failed-request message
pub fn format_error_body(reason: &str) -> String {
    format!(
        "**Error:** {}\n\n*Retry to try again, or check your connection and try sending another message.*",
        reason
    )
}

/// Partial update applied to a single message
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub liked: Option<bool>,
    pub disliked: Option<bool>,
    pub error: Option<bool>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Toggle-like patch as applied by the feedback buttons
    pub fn toggle_like(message: &Message) -> Self {
        Self {
            liked: Some(!message.is_liked()),
            disliked: Some(false),
            ..Self::default()
        }
    }

    pub fn toggle_dislike(message: &Message) -> Self {
        Self {
            liked: Some(false),
            disliked: Some(!message.is_disliked()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_unset_flags_are_omitted() {
        let message = Message::user("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("liked").is_none());
        assert!(value.get("error").is_none());
        assert_eq!(value["role"], "user");
    }

    #[test]
    fn test_error_message_body() {
        let message = Message::assistant_error("HTTP error! status: 500");
        assert!(message.is_error());
        assert_eq!(message.role, Role::Assistant);
        assert!(message.content.starts_with("**Error:** HTTP error! status: 500"));
    }

    #[test]
    fn test_like_patch_clears_dislike() {
        let mut message = Message::assistant("answer");
        message.apply(&MessagePatch::toggle_dislike(&message));
        assert!(message.is_disliked());

        message.apply(&MessagePatch::toggle_like(&message));
        assert!(message.is_liked());
        assert!(!message.is_disliked());
    }

    #[test]
    fn test_short_id() {
        let id = MessageId::from("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
        assert_eq!(MessageId::from("abc").short(), "abc");
    }
}
