//! Per-chat state and the operations callers drive it with.
//!
//! [`ChatState`] bundles one chat's corpus, policy, mood, and model.
//! The entry points mirror what the hosting service needs:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`on_message`](ChatState::on_message) | append → conditional retrain → select → generate |
//! | [`apply_admin_action`](ChatState::apply_admin_action) | settings mutations |
//! | [`should_respond`](ChatState::should_respond) | the chance decision alone |
//! | [`export_text`](ChatState::export_text) | human-readable corpus dump |
//! | [`import_lines`](ChatState::import_lines) | bulk corpus load + forced retrain |
//!
//! All chance decisions bottom out in
//! [`should_respond_with_roll`](ChatState::should_respond_with_roll) so
//! tests can pin the drawn value instead of seeding their way to it.

use chrono::{TimeZone, Utc};
use rand::Rng;
use tracing::info;

use crate::corpus::ChatCorpus;
use crate::generate;
use crate::policy::{AdminAction, ChatPolicy, Mood, DEFAULT_HYPE_INTENSITY, TRIGGERED_CHANCE};
use crate::trainer::{self, TrainedModel, MIN_TRAINING_MESSAGES, RETRAIN_EVERY};

/// Inbound lines shorter than this (after trimming) are ignored.
pub const MIN_MESSAGE_CHARS: usize = 2;

/// How much of the inbound message seeds the contextual sub-model.
pub const CONTEXT_HINT_CHARS: usize = 50;

/// Export covers at most this many recent corpus lines.
pub const EXPORT_LIMIT: usize = 1000;

/// Import accepts at most this many lines per invocation.
pub const IMPORT_LIMIT: usize = 1000;

/// Cap on the activity bonus, in percentage points.
const ACTIVITY_BONUS_CAP: f64 = 20.0;

/// Complete mutable state for one chat.
#[derive(Debug, Clone)]
pub struct ChatState {
    pub chat_id: i64,
    pub corpus: ChatCorpus,
    pub policy: ChatPolicy,
    pub mood: Mood,
    pub model: Option<TrainedModel>,
    pub custom_responses: Vec<String>,
    pub used_endings: Vec<String>,
    /// Epoch seconds of the last inbound message.
    pub last_activity: i64,
}

impl ChatState {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            corpus: ChatCorpus::new(),
            policy: ChatPolicy::default(),
            mood: Mood::Neutral,
            model: None,
            custom_responses: Vec::new(),
            used_endings: Vec::new(),
            last_activity: 0,
        }
    }

    /// Run the trainer and install the result if one was built.
    ///
    /// Returns true iff a new model was installed.
    pub fn maybe_retrain<R: Rng + ?Sized>(&mut self, force: bool, rng: &mut R) -> bool {
        let built = trainer::maybe_retrain(
            self.chat_id,
            &self.corpus,
            &self.policy,
            &self.used_endings,
            self.model.as_ref(),
            force,
            rng,
        );
        match built {
            Some(model) => {
                self.model = Some(model);
                true
            }
            None => false,
        }
    }

    /// Whether generation is possible at all right now.
    pub fn can_generate(&self, now: i64) -> bool {
        if self.policy.disabled_until > now {
            return false;
        }
        self.corpus.len() >= MIN_TRAINING_MESSAGES && self.model.is_some()
    }

    /// The effective response chance in percent, before clamping.
    pub fn response_chance(&self, triggered: bool) -> f64 {
        let base = if triggered {
            TRIGGERED_CHANCE
        } else {
            self.policy.response_chance as f64
                * self.mood.chance_multiplier()
                * self.policy.hype_multiplier()
        };
        let activity_bonus = (self.corpus.message_count() as f64 / 1000.0).min(ACTIVITY_BONUS_CAP);
        (base + activity_bonus).clamp(1.0, 100.0)
    }

    /// The chance decision with an explicit roll in `[0, 100)`.
    pub fn should_respond_with_roll(&self, triggered: bool, now: i64, roll: f64) -> bool {
        if !self.can_generate(now) {
            return false;
        }
        roll <= self.response_chance(triggered)
    }

    /// The chance decision with a drawn roll.
    pub fn should_respond<R: Rng + ?Sized>(&self, triggered: bool, now: i64, rng: &mut R) -> bool {
        self.should_respond_with_roll(triggered, now, rng.random::<f64>() * 100.0)
    }

    /// Produce a candidate message via the generator.
    pub fn generate<R: Rng + ?Sized>(&mut self, context_hint: &str, rng: &mut R) -> Option<String> {
        generate::generate(
            self.model.as_ref(),
            &self.corpus,
            &self.policy,
            &self.custom_responses,
            &mut self.used_endings,
            context_hint,
            rng,
        )
    }

    /// The single combined entry point: learn from the message, then
    /// maybe answer it.
    ///
    /// Returns the generated reply, or `None` when the bot stays quiet
    /// this turn (not selected, nothing generable, or the text was too
    /// short to matter).
    pub fn on_message<R: Rng + ?Sized>(
        &mut self,
        text: &str,
        triggered: bool,
        now: i64,
        rng: &mut R,
    ) -> Option<String> {
        let cleaned = text.trim();
        if cleaned.chars().count() < MIN_MESSAGE_CHARS {
            return None;
        }
        // Command syntax belongs to the platform, not the corpus.
        if cleaned.starts_with('/') {
            return None;
        }

        self.corpus.record_seen();
        self.last_activity = now;

        if self.policy.learning_enabled {
            self.corpus
                .append(cleaned.to_string(), self.policy.max_messages);
            // Opportunistic background refresh every N-th stored line.
            if self.corpus.len() % RETRAIN_EVERY == 0 {
                self.maybe_retrain(false, rng);
            }
        }

        if !self.should_respond(triggered, now, rng) {
            return None;
        }

        self.maybe_retrain(false, rng);

        let hint: String = cleaned.chars().take(CONTEXT_HINT_CHARS).collect();
        self.generate(&hint, rng)
    }

    /// Apply one administrative action and return the resulting policy.
    pub fn apply_admin_action<R: Rng + ?Sized>(
        &mut self,
        action: AdminAction,
        now: i64,
        rng: &mut R,
    ) -> &ChatPolicy {
        match action {
            AdminAction::CycleResponseChance => {
                let next = self.policy.response_chance + 5;
                self.policy.response_chance = if next > 50 { 5 } else { next };
            }
            AdminAction::ToggleReplies => {
                self.policy.allow_replies = !self.policy.allow_replies;
            }
            AdminAction::ToggleMentions => {
                self.policy.allow_mentions = !self.policy.allow_mentions;
            }
            AdminAction::ToggleLearning => {
                // Freezes corpus and model; clears neither.
                self.policy.learning_enabled = !self.policy.learning_enabled;
            }
            AdminAction::ToggleHypeMode => {
                self.policy.hype_mode = !self.policy.hype_mode;
                if self.policy.hype_mode {
                    self.policy.hype_intensity = DEFAULT_HYPE_INTENSITY;
                    self.mood = Mood::Hyped;
                    self.maybe_retrain(true, rng);
                } else {
                    self.mood = Mood::Neutral;
                }
            }
            AdminAction::HypeIntensityUp => {
                if self.policy.hype_intensity < 5 {
                    self.policy.hype_intensity += 1;
                    self.maybe_retrain(true, rng);
                }
            }
            AdminAction::HypeIntensityDown => {
                if self.policy.hype_intensity > 1 {
                    self.policy.hype_intensity -= 1;
                    self.maybe_retrain(true, rng);
                }
            }
            AdminAction::SetMood(mood) => {
                self.mood = mood;
            }
            AdminAction::DisableFor(seconds) => {
                self.policy.disabled_until = now + seconds.max(0);
            }
            AdminAction::Enable => {
                self.policy.disabled_until = 0;
            }
            AdminAction::Retrain => {
                self.maybe_retrain(true, rng);
            }
            AdminAction::ClearHistory => {
                self.corpus.clear();
                self.model = None;
                info!(chat_id = self.chat_id, "corpus cleared, model invalidated");
            }
        }
        &self.policy
    }

    /// Human-readable export of the most recent corpus lines.
    ///
    /// Header states chat id, counts, timestamp, mood, and the hype
    /// flag, followed by numbered lines.
    pub fn export_text(&self, now: i64) -> String {
        let exported = self.corpus.tail(EXPORT_LIMIT);
        let when = Utc
            .timestamp_opt(now, 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| now.to_string());

        let mut out = String::new();
        out.push_str(&format!("Chat {} corpus export\n", self.chat_id));
        out.push_str(&format!(
            "Messages stored: {} (seen: {})\n",
            self.corpus.len(),
            self.corpus.message_count()
        ));
        out.push_str(&format!("Exported at: {}\n", when));
        out.push_str(&format!("Mood: {}\n", self.mood));
        out.push_str(&format!(
            "Hype mode: {}\n",
            if self.policy.hype_mode { "on" } else { "off" }
        ));
        out.push_str(&"=".repeat(50));
        out.push_str("\n\n");

        for (i, line) in exported.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, line));
        }
        out
    }

    /// Bulk-append up to [`IMPORT_LIMIT`] lines, then force a retrain.
    ///
    /// Lines are trimmed; anything shorter than
    /// [`MIN_MESSAGE_CHARS`] after trimming is discarded. Returns the
    /// number of lines actually appended.
    pub fn import_lines<R, I, S>(&mut self, lines: I, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut imported = 0;
        for line in lines.into_iter().take(IMPORT_LIMIT) {
            let cleaned = line.as_ref().trim();
            if cleaned.chars().count() < MIN_MESSAGE_CHARS {
                continue;
            }
            self.corpus.record_seen();
            self.corpus
                .append(cleaned.to_string(), self.policy.max_messages);
            imported += 1;
        }
        if imported > 0 {
            self.maybe_retrain(true, rng);
        }
        imported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trained_state(lines: usize) -> ChatState {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(42);
        for i in 0..lines {
            state.corpus.record_seen();
            state.corpus.append(
                format!("line number {} talks about everyday things", i),
                state.policy.max_messages,
            );
        }
        state.maybe_retrain(true, &mut rng);
        state
    }

    #[test]
    fn test_selector_refuses_while_disabled() {
        let mut state = trained_state(60);
        assert!(state.model.is_some());
        state.policy.response_chance = 100;
        state.policy.disabled_until = 1_000;

        // Chance forced to 100, roll forced to 0: the disable window
        // must still win.
        assert!(!state.should_respond_with_roll(false, 999, 0.0));
        assert!(state.should_respond_with_roll(false, 1_000, 0.0));
    }

    #[test]
    fn test_selector_refuses_without_model() {
        let state = ChatState::new(1);
        assert!(!state.should_respond_with_roll(true, 0, 0.0));
    }

    #[test]
    fn test_chance_boundary_at_five_percent() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        // append() alone leaves message_count at zero, so the activity
        // bonus contributes nothing here.
        let mut corpus = ChatCorpus::new();
        for i in 0..60 {
            corpus.append(
                format!("line number {} talks about everyday things", i),
                state.policy.max_messages,
            );
        }
        state.corpus = corpus;
        state.maybe_retrain(true, &mut rng);
        assert!(state.model.is_some());

        state.policy.response_chance = 5;
        state.mood = Mood::Neutral;
        assert!((state.response_chance(false) - 5.0).abs() < 1e-9);

        assert!(state.should_respond_with_roll(false, 0, 4.9));
        assert!(!state.should_respond_with_roll(false, 0, 5.1));
    }

    #[test]
    fn test_triggered_base_chance() {
        let mut state = trained_state(60);
        state.policy.response_chance = 1;
        let chance = state.response_chance(true);
        assert!(chance >= 80.0, "triggered chance {} below base", chance);
    }

    #[test]
    fn test_activity_bonus_caps_at_twenty() {
        let mut state = trained_state(60);
        state.corpus = ChatCorpus::from_parts(state.corpus.messages().to_vec(), 1_000_000);
        let with_bonus = state.response_chance(false);
        assert!((with_bonus - 25.0).abs() < 1e-9, "got {}", with_bonus);
    }

    #[test]
    fn test_on_message_ignores_short_text() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        assert!(state.on_message("x", false, 0, &mut rng).is_none());
        assert_eq!(state.corpus.len(), 0);
        assert_eq!(state.corpus.message_count(), 0);
    }

    #[test]
    fn test_on_message_ignores_commands() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        assert!(state.on_message("/stats now", false, 0, &mut rng).is_none());
        assert_eq!(state.corpus.len(), 0);
        assert_eq!(state.corpus.message_count(), 0);
    }

    #[test]
    fn test_on_message_learns_even_when_quiet() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        state.policy.response_chance = 1;
        state.on_message("a perfectly normal message", false, 0, &mut rng);
        assert_eq!(state.corpus.len(), 1);
        assert_eq!(state.corpus.message_count(), 1);
    }

    #[test]
    fn test_learning_disabled_freezes_corpus_but_counts() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        state.policy.learning_enabled = false;
        state.on_message("this will not be stored", false, 0, &mut rng);
        assert_eq!(state.corpus.len(), 0);
        assert_eq!(state.corpus.message_count(), 1);
    }

    #[test]
    fn test_chance_cycle_wraps_at_fifty() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        assert_eq!(state.policy.response_chance, 5);
        for expected in [10, 15, 20, 25, 30, 35, 40, 45, 50, 5] {
            state.apply_admin_action(AdminAction::CycleResponseChance, 0, &mut rng);
            assert_eq!(state.policy.response_chance, expected);
        }
    }

    #[test]
    fn test_hype_toggle_resets_intensity_and_mood() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        state.policy.hype_intensity = 1;
        state.apply_admin_action(AdminAction::ToggleHypeMode, 0, &mut rng);
        assert!(state.policy.hype_mode);
        assert_eq!(state.policy.hype_intensity, DEFAULT_HYPE_INTENSITY);
        assert_eq!(state.mood, Mood::Hyped);

        state.apply_admin_action(AdminAction::ToggleHypeMode, 0, &mut rng);
        assert!(!state.policy.hype_mode);
        assert_eq!(state.mood, Mood::Neutral);
    }

    #[test]
    fn test_intensity_clamps() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        state.policy.hype_intensity = 5;
        state.apply_admin_action(AdminAction::HypeIntensityUp, 0, &mut rng);
        assert_eq!(state.policy.hype_intensity, 5);

        state.policy.hype_intensity = 1;
        state.apply_admin_action(AdminAction::HypeIntensityDown, 0, &mut rng);
        assert_eq!(state.policy.hype_intensity, 1);
    }

    #[test]
    fn test_retrain_action_builds_model_on_demand() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        for i in 0..60 {
            state.corpus.record_seen();
            state.corpus.append(
                format!("line number {} talks about everyday things", i),
                state.policy.max_messages,
            );
        }
        assert!(state.model.is_none());

        state.apply_admin_action(AdminAction::Retrain, 0, &mut rng);
        assert!(state.model.is_some());

        // Learning disabled freezes the model against a forced rebuild.
        let mut frozen = ChatState::new(2);
        frozen.policy.learning_enabled = false;
        for i in 0..60 {
            frozen.corpus.record_seen();
            frozen
                .corpus
                .append(format!("frozen line {}", i), frozen.policy.max_messages);
        }
        frozen.apply_admin_action(AdminAction::Retrain, 0, &mut rng);
        assert!(frozen.model.is_none());
    }

    #[test]
    fn test_clear_history_invalidates_model() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = trained_state(60);
        assert!(state.model.is_some());
        state.apply_admin_action(AdminAction::ClearHistory, 0, &mut rng);
        assert!(state.corpus.is_empty());
        assert!(state.model.is_none());
    }

    #[test]
    fn test_disable_and_enable() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        state.apply_admin_action(AdminAction::DisableFor(600), 100, &mut rng);
        assert_eq!(state.policy.disabled_until, 700);
        state.apply_admin_action(AdminAction::Enable, 100, &mut rng);
        assert_eq!(state.policy.disabled_until, 0);
    }

    #[test]
    fn test_import_filters_short_lines() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        let imported = state.import_lines(["a", " ", "valid line"], &mut rng);
        assert_eq!(imported, 1);
        assert_eq!(state.corpus.messages(), &["valid line"]);

        // Exactly two characters after trimming is the boundary: kept.
        let imported = state.import_lines([" ab "], &mut rng);
        assert_eq!(imported, 1);
        assert_eq!(state.corpus.tail(1), &["ab"]);
    }

    #[test]
    fn test_import_caps_at_limit() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        let lines: Vec<String> = (0..1500).map(|i| format!("imported line {}", i)).collect();
        let imported = state.import_lines(&lines, &mut rng);
        assert_eq!(imported, IMPORT_LIMIT);
        // Enough lines came in to cross the training minimum.
        assert!(state.model.is_some());
    }

    #[test]
    fn test_export_format() {
        let mut state = ChatState::new(7);
        for i in 0..3 {
            state.corpus.record_seen();
            state
                .corpus
                .append(format!("exported line {}", i), state.policy.max_messages);
        }
        let text = state.export_text(0);
        assert!(text.starts_with("Chat 7 corpus export\n"));
        assert!(text.contains("Messages stored: 3 (seen: 3)"));
        assert!(text.contains("Mood: neutral"));
        assert!(text.contains("\n1. exported line 0\n"));
        assert!(text.contains("\n3. exported line 2\n"));
    }

    #[test]
    fn test_forty_nine_then_fifty_scenario() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ChatState::new(1);
        for i in 0..49 {
            state.corpus.record_seen();
            state.corpus.append(
                format!("distinct short message {}", i),
                state.policy.max_messages,
            );
        }
        assert!(!state.maybe_retrain(false, &mut rng));
        assert!(state.model.is_none());

        state.corpus.record_seen();
        state
            .corpus
            .append("the fiftieth message".to_string(), state.policy.max_messages);
        assert!(state.maybe_retrain(true, &mut rng));
        assert!(state.model.is_some());
    }
}
