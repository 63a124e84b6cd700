//! In-memory [`ChatStore`] implementation for tests.
//!
//! A `HashMap` behind `std::sync::RwLock`. Futures resolve
//! immediately; there is no I/O to fail, so this store never errors.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::snapshot::ChatSnapshot;

use super::ChatStore;

/// In-memory snapshot store.
#[derive(Default)]
pub struct InMemoryStore {
    chats: RwLock<HashMap<i64, ChatSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn load_all(&self) -> Result<Vec<ChatSnapshot>> {
        let chats = self.chats.read().unwrap();
        Ok(chats.values().cloned().collect())
    }

    async fn save(&self, snapshot: &ChatSnapshot) -> Result<()> {
        let mut chats = self.chats.write().unwrap();
        chats.insert(snapshot.chat_id, snapshot.clone());
        Ok(())
    }

    async fn delete(&self, chat_id: i64) -> Result<()> {
        let mut chats = self.chats.write().unwrap();
        chats.remove(&chat_id);
        Ok(())
    }
}
