//! UI-agnostic core of the Parley chat client.
//!
//! Owns the chat collection, the single in-flight assistant request, the
//! key/value persistence of chats and preferences, and the markdown
//! rendering used by front ends.

pub mod config;
pub mod controllers;
pub mod error;
pub mod logging;
pub mod models;
pub mod repositories;
pub mod services;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::AppConfig;
pub use controllers::{Completion, ConversationController, OutgoingRequest};
pub use error::{ConfigError, CoreError};
pub use models::{
    Chat, ChatId, Message, MessageId, MessagePatch, Notification, NotificationLevel,
    RequestStatus, RequestTicket, Role, Settlement, SidebarState, Theme,
};
pub use repositories::{
    ChatStateRepository, InMemoryStore, IntegrationSettings, JsonFileStore, KeyValueStore,
    PersistedState, RepositoryError,
};
pub use services::{
    AssistantClient, AssistantRequest, HistoryEntry, HttpAssistantClient, RenderedContent,
    RequestError, render_markdown,
};
