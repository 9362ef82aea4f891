use serde::{Deserialize, Serialize};

pub const CONFLUENCE_SETTINGS_KEY: &str = "confluence-settings";
pub const SVPORTAL_SETTINGS_KEY: &str = "svportal-settings";

/// Confluence integration: a plain list of page references
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceSettings {
    #[serde(default)]
    pub items: Vec<String>,
}

impl ConfluenceSettings {
    /// Append a trimmed item; blank input is ignored
    pub fn add_item(&mut self, item: &str) -> bool {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.items.push(trimmed.to_string());
        true
    }

    pub fn remove_item(&mut self, index: usize) -> Option<String> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }
}

/// SV portal integration: credentials plus the entities to query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvPortalSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub entities: Vec<String>,
}

impl Default for SvPortalSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            // One empty row so the form starts with an input
            entities: vec![String::new()],
        }
    }
}

impl SvPortalSettings {
    /// Copy with blank entities dropped, as written to storage
    pub fn without_blank_entities(&self) -> Self {
        Self {
            entities: self
                .entities
                .iter()
                .filter(|e| !e.trim().is_empty())
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// Both auxiliary settings blobs. Each is read and written wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrationSettings {
    pub confluence: ConfluenceSettings,
    pub svportal: SvPortalSettings,
}
