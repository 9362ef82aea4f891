pub mod chat;
pub mod chats_store;
pub mod message;
pub mod notification;
pub mod preferences;
pub mod request_manager;

pub use chat::{Chat, ChatId, DEFAULT_CHAT_TITLE, derive_title};
pub use chats_store::ChatsStore;
pub use message::{Message, MessageId, MessagePatch, Role};
pub use notification::{Notification, NotificationLevel, NotificationQueue};
pub use preferences::{SidebarState, Theme};
pub use request_manager::{RequestManager, RequestStatus, RequestTicket, Settlement};
