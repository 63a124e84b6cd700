//! Message handling and persistence orchestration.
//!
//! [`BotService`] owns the chat registry and the store. Everything that
//! touches a chat goes through its per-chat mutex; the CPU-heavy parts
//! (retraining, generation) run under [`tokio::task::block_in_place`]
//! so the model rebuild and the corpus it reads stay atomic without
//! stalling the runtime's other workers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Timelike, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use chatterbox_core::policy::{cycle_mood, AdminAction, ChatPolicy, Mood};
use chatterbox_core::theme::HYPE_GREETINGS;
use chatterbox_core::{ChatSnapshot, ChatState, ChatStore};

use crate::config::Config;
use crate::registry::ChatRegistry;

/// A generated reply plus the mood-derived delay to apply before
/// sending it.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub delay: Duration,
}

/// Per-chat counters for the stats command.
#[derive(Debug, Clone)]
pub struct ChatStats {
    pub chat_id: i64,
    pub stored: usize,
    pub seen: u64,
    pub mood: Mood,
    pub response_chance: u32,
    pub hype_mode: bool,
    pub learning_enabled: bool,
    /// Fingerprint of the installed model, empty when untrained.
    pub model_version: String,
    pub disabled_until: i64,
    pub last_activity: i64,
}

pub struct BotService {
    config: Config,
    registry: ChatRegistry,
    store: Arc<dyn ChatStore>,
}

impl BotService {
    /// Restore every persisted chat and rebuild its model.
    pub async fn load(config: Config, store: Arc<dyn ChatStore>) -> Result<Self> {
        let snapshots = store.load_all().await?;
        let count = snapshots.len();

        // Snapshots never carry the chain itself, so each chat gets a
        // forced retrain. That is pure CPU work; keep it off the
        // runtime threads.
        let states = tokio::task::spawn_blocking(move || {
            let mut rng = rand::rng();
            snapshots
                .into_iter()
                .map(|snapshot| {
                    let mut state = snapshot.into_state();
                    state.maybe_retrain(true, &mut rng);
                    state
                })
                .collect::<Vec<ChatState>>()
        })
        .await?;

        let registry = ChatRegistry::new();
        for state in states {
            registry.insert(state).await;
        }
        info!(chats = count, "chat state restored");

        Ok(Self {
            config,
            registry,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one inbound chat message: learn from it, and maybe
    /// produce a reply.
    pub async fn on_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_bot: bool,
    ) -> Result<Option<Reply>> {
        let now = Utc::now().timestamp();
        let handle = self.registry.get_or_create(chat_id).await;
        let mut state = handle.lock().await;

        let triggered = (reply_to_bot && state.policy.allow_replies)
            || (state.policy.allow_mentions && self.config.bot.is_mentioned(text));

        let result = tokio::task::block_in_place(|| {
            let mut rng = rand::rng();
            let reply = state.on_message(text, triggered, now, &mut rng)?;
            let (lo, hi) = state.mood.delay_range();
            let delay = Duration::from_secs_f64(rng.random_range(lo..=hi));
            Some(Reply { text: reply, delay })
        });

        if let Some(reply) = &result {
            debug!(
                chat_id,
                triggered,
                delay_ms = reply.delay.as_millis() as u64,
                "reply generated"
            );
        }
        Ok(result)
    }

    /// Apply an admin action and persist the resulting state.
    ///
    /// Returns the policy and, for actions with a user-visible outcome
    /// (hype mode switched on, forced retrain), an announcement line
    /// for the chat.
    pub async fn admin_action(
        &self,
        chat_id: i64,
        action: AdminAction,
    ) -> Result<(ChatPolicy, Option<String>)> {
        let now = Utc::now().timestamp();
        let handle = self.registry.get_or_create(chat_id).await;

        let (policy, snapshot, retrained) = {
            let mut state = handle.lock().await;
            let retrained = tokio::task::block_in_place(|| {
                let mut rng = rand::rng();
                // The retrain outcome is reported to the operator, so
                // it is captured here rather than going through the
                // fire-and-forget path in the engine.
                if let AdminAction::Retrain = action {
                    state.maybe_retrain(true, &mut rng)
                } else {
                    state.apply_admin_action(action, now, &mut rng);
                    false
                }
            });
            (
                state.policy.clone(),
                ChatSnapshot::from_state(&state),
                retrained,
            )
        };

        let announcement = match action {
            AdminAction::Retrain => Some(if retrained {
                "Model retrained.".to_string()
            } else {
                "No model built; the corpus is too small or learning is off.".to_string()
            }),
            AdminAction::ToggleHypeMode if policy.hype_mode => {
                let mut rng = rand::rng();
                HYPE_GREETINGS.choose(&mut rng).map(|s| (*s).to_string())
            }
            _ => None,
        };

        self.store.save(&snapshot).await?;
        info!(chat_id, "admin action applied");
        Ok((policy, announcement))
    }

    /// Force-generate one message, ignoring the response chance.
    pub async fn say(&self, chat_id: i64, context: &str) -> Result<Option<String>> {
        let handle = self.registry.get_or_create(chat_id).await;
        let mut state = handle.lock().await;
        let reply = tokio::task::block_in_place(|| {
            let mut rng = rand::rng();
            state.maybe_retrain(false, &mut rng);
            state.generate(context, &mut rng)
        });
        Ok(reply)
    }

    /// Export the corpus of one chat, or `None` if it has no state.
    pub async fn export(&self, chat_id: i64) -> Option<String> {
        let handle = self.registry.get(chat_id).await?;
        let state = handle.lock().await;
        Some(state.export_text(Utc::now().timestamp()))
    }

    /// Bulk-import corpus lines and persist. Returns the count kept.
    pub async fn import<I, S>(&self, chat_id: i64, lines: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let handle = self.registry.get_or_create(chat_id).await;
        let snapshot;
        let imported;
        {
            let mut state = handle.lock().await;
            imported = tokio::task::block_in_place(|| {
                let mut rng = rand::rng();
                state.import_lines(lines, &mut rng)
            });
            snapshot = ChatSnapshot::from_state(&state);
        }
        self.store.save(&snapshot).await?;
        info!(chat_id, imported, "corpus import finished");
        Ok(imported)
    }

    /// Stats for every loaded chat, ordered by id.
    pub async fn stats(&self) -> Vec<ChatStats> {
        let mut out = Vec::new();
        for chat_id in self.registry.chat_ids().await {
            let Some(handle) = self.registry.get(chat_id).await else {
                continue;
            };
            let state = handle.lock().await;
            out.push(ChatStats {
                chat_id,
                stored: state.corpus.len(),
                seen: state.corpus.message_count(),
                mood: state.mood,
                response_chance: state.policy.response_chance,
                hype_mode: state.policy.hype_mode,
                learning_enabled: state.policy.learning_enabled,
                model_version: state
                    .model
                    .as_ref()
                    .map(|m| m.fingerprint.clone())
                    .unwrap_or_default(),
                disabled_until: state.policy.disabled_until,
                last_activity: state.last_activity,
            });
        }
        out
    }

    /// Persist one chat.
    pub async fn save_chat(&self, chat_id: i64) -> Result<()> {
        let Some(handle) = self.registry.get(chat_id).await else {
            return Ok(());
        };
        let snapshot = {
            let state = handle.lock().await;
            ChatSnapshot::from_state(&state)
        };
        self.store.save(&snapshot).await
    }

    /// Persist every loaded chat. A failure in one chat is logged and
    /// does not stop the sweep. Returns `(saved, failed)`.
    pub async fn save_all(&self) -> (usize, usize) {
        let mut saved = 0;
        let mut failed = 0;
        for chat_id in self.registry.chat_ids().await {
            match self.save_chat(chat_id).await {
                Ok(()) => saved += 1,
                Err(err) => {
                    failed += 1;
                    warn!(chat_id, error = %err, "failed to save chat");
                }
            }
        }
        (saved, failed)
    }

    /// Run one mood drift pass over every chat at the current local hour.
    pub async fn cycle_moods(&self) {
        self.cycle_moods_at(chrono::Local::now().hour()).await;
    }

    /// The drift pass with an explicit hour. A changed mood is persisted
    /// right away; a crash between passes must not roll it back.
    pub async fn cycle_moods_at(&self, hour: u32) {
        for chat_id in self.registry.chat_ids().await {
            let Some(handle) = self.registry.get(chat_id).await else {
                continue;
            };
            let changed = {
                let mut state = handle.lock().await;
                let mut rng = rand::rng();
                let next = cycle_mood(state.mood, hour, state.policy.hype_mode, &mut rng);
                if next != state.mood {
                    info!(chat_id, from = %state.mood, to = %next, "mood drifted");
                    state.mood = next;
                    true
                } else {
                    false
                }
            };
            if changed {
                if let Err(err) = self.save_chat(chat_id).await {
                    warn!(chat_id, error = %err, "failed to persist mood change");
                }
            }
        }
    }
}
