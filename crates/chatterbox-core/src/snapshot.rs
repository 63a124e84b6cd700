//! Serializable per-chat snapshot.
//!
//! The snapshot is the persistence contract: every field of
//! [`ChatState`] that cannot be rebuilt round-trips through it exactly,
//! and every field carries a serde default so snapshots written by
//! older versions load without ceremony. The trained model itself is
//! not persisted — only its fingerprint is recorded, and the loader
//! rebuilds the chain with a forced retrain.

use serde::{Deserialize, Serialize};

use crate::corpus::ChatCorpus;
use crate::engine::ChatState;
use crate::generate::USED_ENDINGS_CAP;
use crate::policy::{ChatPolicy, Mood};

/// Persisted form of one chat's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSnapshot {
    pub chat_id: i64,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub policy: ChatPolicy,
    #[serde(default)]
    pub custom_responses: Vec<String>,
    #[serde(default)]
    pub used_endings: Vec<String>,
    #[serde(default)]
    pub last_activity: i64,
    /// Fingerprint of the model at save time, informational only.
    #[serde(default)]
    pub model_version: String,
}

impl ChatSnapshot {
    /// Capture a snapshot. The corpus is limited to the policy's
    /// window and the used-endings history to its bound.
    pub fn from_state(state: &ChatState) -> Self {
        let messages = state.corpus.window(state.policy.max_messages).to_vec();
        let endings_start = state.used_endings.len().saturating_sub(USED_ENDINGS_CAP);
        Self {
            chat_id: state.chat_id,
            messages,
            message_count: state.corpus.message_count(),
            mood: state.mood,
            policy: state.policy.clone(),
            custom_responses: state.custom_responses.clone(),
            used_endings: state.used_endings[endings_start..].to_vec(),
            last_activity: state.last_activity,
            model_version: state
                .model
                .as_ref()
                .map(|m| m.fingerprint.clone())
                .unwrap_or_default(),
        }
    }

    /// Restore chat state. The model is left unset; callers force a
    /// retrain afterwards (as the startup loader does).
    pub fn into_state(self) -> ChatState {
        ChatState {
            chat_id: self.chat_id,
            corpus: ChatCorpus::from_parts(self.messages, self.message_count),
            policy: self.policy,
            mood: self.mood,
            model: None,
            custom_responses: self.custom_responses,
            used_endings: self.used_endings,
            last_activity: self.last_activity,
        }
    }
}
