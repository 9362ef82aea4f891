use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::integration_settings::{
    CONFLUENCE_SETTINGS_KEY, ConfluenceSettings, IntegrationSettings, SVPORTAL_SETTINGS_KEY,
    SvPortalSettings,
};
use super::kv_store::KeyValueStore;
use crate::models::{Chat, SidebarState, Theme};

pub const CHATS_KEY: &str = "chat-app-chats";
pub const THEME_KEY: &str = "chat-app-theme";
pub const SIDEBAR_KEY: &str = "chat-app-sidebar";

/// Everything restored at startup
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersistedState {
    pub chats: Vec<Chat>,
    pub theme: Theme,
    pub sidebar: SidebarState,
}

/// Serializes chats and preferences into a [`KeyValueStore`].
///
/// Reads are tolerant: a missing or malformed entry falls back to its
/// default. Writes are best-effort: failures are logged and reported as
/// `false`, never propagated, so in-memory state stays authoritative.
pub struct ChatStateRepository {
    store: Box<dyn KeyValueStore>,
}

impl ChatStateRepository {
    pub fn new(store: impl KeyValueStore) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn storage_path(&self) -> String {
        self.store.storage_path()
    }

    pub fn load(&self) -> PersistedState {
        let chats = self.read_json::<Vec<Chat>>(CHATS_KEY).unwrap_or_default();

        let theme = self
            .read_raw(THEME_KEY)
            .and_then(|raw| {
                let parsed = Theme::parse(&raw);
                if parsed.is_none() {
                    warn!(value = %raw, "Ignoring unknown theme value");
                }
                parsed
            })
            .unwrap_or_default();

        let sidebar = self
            .read_raw(SIDEBAR_KEY)
            .and_then(|raw| {
                let parsed = SidebarState::parse(&raw);
                if parsed.is_none() {
                    warn!(value = %raw, "Ignoring unknown sidebar value");
                }
                parsed
            })
            .unwrap_or_default();

        debug!(
            chats = chats.len(),
            theme = theme.as_str(),
            sidebar = sidebar.as_str(),
            "Loaded persisted state"
        );

        PersistedState {
            chats,
            theme,
            sidebar,
        }
    }

    /// Replace the stored chat collection with `chats`
    pub fn save_chats(&mut self, chats: &[Chat]) -> bool {
        match serde_json::to_string(chats) {
            Ok(json) => self.write_raw(CHATS_KEY, &json),
            Err(e) => {
                warn!(error = ?e, "Failed to serialize chats");
                false
            }
        }
    }

    pub fn clear_chats(&mut self) -> bool {
        match self.store.remove(CHATS_KEY) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = ?e, "Failed to clear stored chats");
                false
            }
        }
    }

    pub fn save_theme(&mut self, theme: Theme) -> bool {
        self.write_raw(THEME_KEY, theme.as_str())
    }

    pub fn save_sidebar(&mut self, sidebar: SidebarState) -> bool {
        self.write_raw(SIDEBAR_KEY, sidebar.as_str())
    }

    pub fn load_integration_settings(&self) -> IntegrationSettings {
        IntegrationSettings {
            confluence: self
                .read_json::<ConfluenceSettings>(CONFLUENCE_SETTINGS_KEY)
                .unwrap_or_default(),
            svportal: self
                .read_json::<SvPortalSettings>(SVPORTAL_SETTINGS_KEY)
                .unwrap_or_default(),
        }
    }

    pub fn save_confluence_settings(&mut self, settings: &ConfluenceSettings) -> bool {
        match serde_json::to_string(settings) {
            Ok(json) => self.write_raw(CONFLUENCE_SETTINGS_KEY, &json),
            Err(e) => {
                warn!(error = ?e, "Failed to serialize confluence settings");
                false
            }
        }
    }

    /// Blank entities are dropped before writing
    pub fn save_svportal_settings(&mut self, settings: &SvPortalSettings) -> bool {
        match serde_json::to_string(&settings.without_blank_entities()) {
            Ok(json) => self.write_raw(SVPORTAL_SETTINGS_KEY, &json),
            Err(e) => {
                warn!(error = ?e, "Failed to serialize svportal settings");
                false
            }
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = ?e, "Failed to read from storage");
                None
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = ?e, "Ignoring malformed stored value");
                None
            }
        }
    }

    fn write_raw(&mut self, key: &str, value: &str) -> bool {
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = ?e, "Failed to write to storage");
                false
            }
        }
    }
}
