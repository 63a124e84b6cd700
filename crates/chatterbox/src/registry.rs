//! In-memory registry of live chat states.
//!
//! Every chat is guarded by its own `tokio::sync::Mutex`, so work on
//! one chat never blocks another. The registry itself only holds the
//! map; locking a state is the caller's job.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use chatterbox_core::ChatState;

#[derive(Default)]
pub struct ChatRegistry {
    chats: RwLock<HashMap<i64, Arc<Mutex<ChatState>>>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an existing chat state or create a fresh one.
    pub async fn get_or_create(&self, chat_id: i64) -> Arc<Mutex<ChatState>> {
        {
            let chats = self.chats.read().await;
            if let Some(state) = chats.get(&chat_id) {
                return Arc::clone(state);
            }
        }
        let mut chats = self.chats.write().await;
        Arc::clone(
            chats
                .entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(ChatState::new(chat_id)))),
        )
    }

    /// Fetch a chat state without creating one.
    pub async fn get(&self, chat_id: i64) -> Option<Arc<Mutex<ChatState>>> {
        let chats = self.chats.read().await;
        chats.get(&chat_id).map(Arc::clone)
    }

    /// Install a restored chat state (used by the startup loader).
    pub async fn insert(&self, state: ChatState) {
        let mut chats = self.chats.write().await;
        chats.insert(state.chat_id, Arc::new(Mutex::new(state)));
    }

    /// Ids of every chat currently loaded.
    pub async fn chat_ids(&self) -> Vec<i64> {
        let chats = self.chats.read().await;
        let mut ids: Vec<i64> = chats.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_returns_same_state() {
        let registry = ChatRegistry::new();
        let a = registry.get_or_create(1).await;
        {
            let mut state = a.lock().await;
            state.corpus.record_seen();
        }
        let b = registry.get_or_create(1).await;
        assert_eq!(b.lock().await.corpus.message_count(), 1);
        assert_eq!(registry.chat_ids().await, vec![1]);
    }

    #[tokio::test]
    async fn test_get_does_not_create() {
        let registry = ChatRegistry::new();
        assert!(registry.get(5).await.is_none());
        registry.get_or_create(5).await;
        assert!(registry.get(5).await.is_some());
    }
}
