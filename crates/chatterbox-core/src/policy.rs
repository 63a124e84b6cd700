//! Per-chat policy: settings, mood, and the day-cycle rule.
//!
//! [`ChatPolicy`] is the versioned settings struct persisted with each
//! chat. Every field carries an explicit serde default so snapshots
//! written by older versions load cleanly; validation happens once at
//! load time, not ad hoc at each read site.
//!
//! [`Mood`] weights both sides of the pipeline: the chance multiplier
//! scales response probability and the delay range controls how long
//! the bot pretends to type before answering.

use std::fmt;
use std::str::FromStr;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default response chance in percent.
pub const DEFAULT_RESPONSE_CHANCE: u32 = 5;

/// Response chance when the bot was directly addressed.
pub const TRIGGERED_CHANCE: f64 = 80.0;

/// Default corpus window size.
pub const DEFAULT_MAX_MESSAGES: usize = 30_000;

/// Default hype intensity when the mode is switched on.
pub const DEFAULT_HYPE_INTENSITY: u32 = 3;

/// Hours (local time) during which the mood is forced to reflective.
pub const NIGHT_HOURS: std::ops::Range<u32> = 0..6;

/// Probability per mood-cycle check of a spontaneous mood change.
const MOOD_DRIFT_CHANCE: f64 = 0.1;

/// The bot's emotional state for one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Grumpy,
    Reflective,
    Hyped,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Neutral,
        Mood::Happy,
        Mood::Grumpy,
        Mood::Reflective,
        Mood::Hyped,
    ];

    /// Multiplier applied to the configured response chance.
    pub fn chance_multiplier(self) -> f64 {
        match self {
            Mood::Neutral => 1.0,
            Mood::Happy => 1.5,
            Mood::Grumpy => 0.5,
            Mood::Reflective => 1.2,
            Mood::Hyped => 2.0,
        }
    }

    /// Artificial response delay range in seconds, `(min, max)`.
    pub fn delay_range(self) -> (f64, f64) {
        match self {
            Mood::Neutral => (1.0, 3.0),
            Mood::Happy => (0.5, 2.0),
            Mood::Grumpy => (0.1, 1.0),
            Mood::Reflective => (2.0, 5.0),
            Mood::Hyped => (0.5, 1.5),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::Grumpy => "grumpy",
            Mood::Reflective => "reflective",
            Mood::Hyped => "hyped",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "neutral" => Ok(Mood::Neutral),
            "happy" => Ok(Mood::Happy),
            "grumpy" => Ok(Mood::Grumpy),
            "reflective" => Ok(Mood::Reflective),
            "hyped" => Ok(Mood::Hyped),
            other => anyhow::bail!("unknown mood: {}", other),
        }
    }
}

/// The day-cycle rule for one mood check.
///
/// Night hours force reflective; active hype mode forces hyped;
/// otherwise there is a small chance of a spontaneous change. The check
/// is idempotent — calling it twice with the same inputs and an
/// unlucky roll leaves the mood unchanged.
pub fn cycle_mood<R: Rng + ?Sized>(
    current: Mood,
    hour: u32,
    hype_mode: bool,
    rng: &mut R,
) -> Mood {
    if NIGHT_HOURS.contains(&hour) {
        Mood::Reflective
    } else if hype_mode {
        Mood::Hyped
    } else if rng.random::<f64>() < MOOD_DRIFT_CHANCE {
        *Mood::ALL.choose(rng).unwrap_or(&current)
    } else {
        current
    }
}

/// Per-chat settings, persisted with the chat snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPolicy {
    /// Base response chance in percent. The cycle action keeps it in
    /// `[5, 50]`; loaded values are taken as-is.
    #[serde(default = "default_response_chance")]
    pub response_chance: u32,
    #[serde(default = "default_true")]
    pub allow_replies: bool,
    #[serde(default = "default_true")]
    pub allow_mentions: bool,
    #[serde(default = "default_true")]
    pub learning_enabled: bool,
    /// Corpus window size; also drives the trim bound.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default)]
    pub hype_mode: bool,
    /// Hype intensity, clamped to `[1, 5]` by the admin actions.
    #[serde(default = "default_hype_intensity")]
    pub hype_intensity: u32,
    /// Epoch seconds until which generation is suppressed. Zero means
    /// not disabled.
    #[serde(default)]
    pub disabled_until: i64,
}

fn default_response_chance() -> u32 {
    DEFAULT_RESPONSE_CHANCE
}
fn default_true() -> bool {
    true
}
fn default_max_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}
fn default_hype_intensity() -> u32 {
    DEFAULT_HYPE_INTENSITY
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            response_chance: DEFAULT_RESPONSE_CHANCE,
            allow_replies: true,
            allow_mentions: true,
            learning_enabled: true,
            max_messages: DEFAULT_MAX_MESSAGES,
            hype_mode: false,
            hype_intensity: DEFAULT_HYPE_INTENSITY,
            disabled_until: 0,
        }
    }
}

impl ChatPolicy {
    /// Multiplier contributed by hype mode: `1 + intensity * 0.2` when
    /// active, otherwise 1.
    pub fn hype_multiplier(&self) -> f64 {
        if self.hype_mode {
            1.0 + self.hype_intensity as f64 * 0.2
        } else {
            1.0
        }
    }
}

/// A policy-mutating action issued by a chat administrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdminAction {
    /// Step `response_chance` by +5, wrapping past 50 back to 5.
    CycleResponseChance,
    ToggleReplies,
    ToggleMentions,
    ToggleLearning,
    /// Flip hype mode. Enabling resets intensity to the default and
    /// forces the hyped mood; disabling returns the mood to neutral.
    ToggleHypeMode,
    HypeIntensityUp,
    HypeIntensityDown,
    SetMood(Mood),
    /// Suppress generation for this many seconds from now.
    DisableFor(i64),
    Enable,
    /// Force a model rebuild from the current corpus.
    Retrain,
    /// Clear the corpus and invalidate the trained model.
    ClearHistory,
}
