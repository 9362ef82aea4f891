pub mod chat_state_repository;
pub mod error;
pub mod in_memory_store;
pub mod integration_settings;
pub mod json_file_store;
pub mod kv_store;

pub use chat_state_repository::{
    CHATS_KEY, ChatStateRepository, PersistedState, SIDEBAR_KEY, THEME_KEY,
};
pub use error::{RepositoryError, RepositoryResult};
pub use in_memory_store::InMemoryStore;
pub use integration_settings::{
    CONFLUENCE_SETTINGS_KEY, ConfluenceSettings, IntegrationSettings, SVPORTAL_SETTINGS_KEY,
    SvPortalSettings,
};
pub use json_file_store::JsonFileStore;
pub use kv_store::KeyValueStore;
