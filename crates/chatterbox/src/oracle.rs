//! Admin permission checks.
//!
//! The event loop consults an [`AdminOracle`] before applying an admin
//! action. The default implementation reads the allow-list from the
//! config file; the trait is async so a deployment can back it with a
//! platform API call instead.

use async_trait::async_trait;

/// Decides whether a user may run admin actions in a chat.
#[async_trait]
pub trait AdminOracle: Send + Sync {
    async fn is_admin(&self, chat_id: i64, user_id: i64) -> bool;
}

/// Allow-list oracle backed by `bot.admin_ids` in the config file.
pub struct ConfigAdmins {
    ids: Vec<i64>,
}

impl ConfigAdmins {
    pub fn new(ids: Vec<i64>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl AdminOracle for ConfigAdmins {
    async fn is_admin(&self, _chat_id: i64, user_id: i64) -> bool {
        self.ids.contains(&user_id)
    }
}
