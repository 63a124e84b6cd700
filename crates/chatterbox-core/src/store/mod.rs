//! Persistence abstraction for chat snapshots.
//!
//! The [`ChatStore`] trait is the boundary between the in-memory chat
//! registry and whatever holds state at rest (SQLite in the
//! application, a HashMap in tests). A write failure for one chat must
//! never poison another: callers persist chat-by-chat and treat each
//! error independently.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::snapshot::ChatSnapshot;

pub use memory::InMemoryStore;

/// Abstract snapshot storage, keyed by chat id.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Load every persisted chat snapshot.
    async fn load_all(&self) -> Result<Vec<ChatSnapshot>>;

    /// Insert or replace the snapshot for one chat.
    async fn save(&self, snapshot: &ChatSnapshot) -> Result<()>;

    /// Remove a chat's persisted state entirely.
    async fn delete(&self, chat_id: i64) -> Result<()>;
}
