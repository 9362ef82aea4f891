use std::sync::Arc;

use super::chat::{Chat, ChatId};

/// Ordered chat collection plus the current-selection reference.
///
/// Chats are held in an immutable snapshot; every mutation swaps in a new
/// snapshot and bumps `revision`, so readers holding the old `Arc` keep a
/// consistent view.
#[derive(Clone, Debug)]
pub struct ChatsStore {
    chats: Arc<[Chat]>,
    current_chat_id: Option<ChatId>,
    revision: u64,
}

impl ChatsStore {
    pub fn new() -> Self {
        Self {
            chats: Arc::from(Vec::new()),
            current_chat_id: None,
            revision: 0,
        }
    }

    /// Restore from persisted chats, selecting the most recent one
    pub fn from_chats(chats: Vec<Chat>) -> Self {
        let current_chat_id = chats.first().map(|c| c.id.clone());
        Self {
            chats: Arc::from(chats),
            current_chat_id,
            revision: 0,
        }
    }

    pub fn snapshot(&self) -> Arc<[Chat]> {
        self.chats.clone()
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn count(&self) -> usize {
        self.chats.len()
    }

    pub fn get(&self, id: &ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ChatId) -> bool {
        self.get(id).is_some()
    }

    pub fn current_id(&self) -> Option<&ChatId> {
        self.current_chat_id.as_ref()
    }

    pub fn current(&self) -> Option<&Chat> {
        self.current_chat_id.as_ref().and_then(|id| self.get(id))
    }

    /// Set the current chat. Returns false (and changes nothing) for unknown ids.
    pub fn set_current(&mut self, id: &ChatId) -> bool {
        if self.contains(id) {
            self.current_chat_id = Some(id.clone());
            self.revision += 1;
            true
        } else {
            false
        }
    }

    /// Insert a chat at the front of the collection
    pub fn prepend(&mut self, chat: Chat) {
        let mut next = Vec::with_capacity(self.chats.len() + 1);
        next.push(chat);
        next.extend(self.chats.iter().cloned());
        self.commit(next);
    }

    /// Replace the chat with the same id. Unknown ids are ignored.
    pub fn replace(&mut self, chat: Chat) -> bool {
        let Some(index) = self.chats.iter().position(|c| c.id == chat.id) else {
            return false;
        };
        let mut next = self.chats.to_vec();
        next[index] = chat;
        self.commit(next);
        true
    }

    /// Remove every chat and clear the selection
    pub fn clear(&mut self) {
        self.current_chat_id = None;
        self.commit(Vec::new());
    }

    fn commit(&mut self, chats: Vec<Chat>) {
        self.chats = Arc::from(chats);
        self.revision += 1;
    }
}

impl Default for ChatsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    #[test]
    fn test_new_store_is_empty() {
        let store = ChatsStore::new();
        assert_eq!(store.count(), 0);
        assert!(store.current().is_none());
    }

    #[test]
    fn test_prepend_orders_most_recent_first() {
        let mut store = ChatsStore::new();
        let first = Chat::new();
        let second = Chat::new();
        store.prepend(first.clone());
        store.prepend(second.clone());
        assert_eq!(store.chats()[0].id, second.id);
        assert_eq!(store.chats()[1].id, first.id);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_replace_keeps_old_snapshot_intact() {
        let mut store = ChatsStore::new();
        let chat = Chat::new();
        store.prepend(chat.clone());
        let before = store.snapshot();

        assert!(store.replace(chat.append_message(Message::user("hi"))));
        assert!(before[0].is_empty());
        assert_eq!(store.chats()[0].messages.len(), 1);
    }

    #[test]
    fn test_set_current_unknown_id() {
        let mut store = ChatsStore::new();
        let chat = Chat::new();
        store.prepend(chat.clone());
        assert!(store.set_current(&chat.id));
        assert!(!store.set_current(&ChatId::from("missing")));
        assert_eq!(store.current_id(), Some(&chat.id));
    }

    #[test]
    fn test_from_chats_selects_first() {
        let a = Chat::new();
        let b = Chat::new();
        let store = ChatsStore::from_chats(vec![a.clone(), b]);
        assert_eq!(store.current_id(), Some(&a.id));
    }

    #[test]
    fn test_clear() {
        let mut store = ChatsStore::new();
        let chat = Chat::new();
        store.prepend(chat.clone());
        store.set_current(&chat.id);
        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.current_id().is_none());
    }
}
