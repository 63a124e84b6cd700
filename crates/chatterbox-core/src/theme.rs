//! Fixed phrase pools for hype mode.
//!
//! When hype mode is active the trainer mixes a sample of
//! [`HYPE_LINES`] into the training text (sized by the chat's
//! intensity), and the generator occasionally appends one of
//! [`HYPE_ENDINGS`] to a finished message. The pools are fixed: hype
//! mode changes the bot's flavor, not its vocabulary source of truth.

/// Thematic sentences injected into the training text.
///
/// The trainer samples `intensity * 3` of these without replacement
/// (clamped to the pool size).
pub const HYPE_LINES: &[&str] = &[
    "Let's absolutely send it today, no second-guessing!",
    "Momentum is everything and this chat has plenty of it!",
    "Nobody hypes the squad like the squad hypes itself!",
    "Every message is a rep, keep the streak alive!",
    "Big energy only, we don't do quiet days here!",
    "The grind never looked this good, keep it rolling!",
    "Full send mode engaged, hold on to something!",
    "Today's forecast: one hundred percent chance of greatness!",
    "We move fast and we cheer louder!",
    "Doubt is a spectator sport and we're on the field!",
    "Crank the dial, there is no eleven, only twelve!",
    "Champions warm up by showing up, and here we are!",
    "This chat runs on pure unfiltered enthusiasm!",
    "Small wins stack into legendary runs!",
    "If it's worth saying, it's worth saying with fireworks!",
    "Nobody remembers the quiet days, make this one loud!",
    "The leaderboard fears this group chat!",
    "Peak form, peak vibes, peak everything!",
    "Every day is game day when the squad is online!",
    "Keep your head up and your caps lock ready!",
];

/// Endings occasionally appended to a generated message in hype mode.
pub const HYPE_ENDINGS: &[&str] = &[
    " Let's go!",
    " Full send!",
    " No brakes on this one!",
    " That's the spirit!",
    " Keep it rolling!",
    " Big win energy!",
    " Onwards and upwards!",
    " We ride at dawn!",
    " Absolute legends!",
    " Can't stop, won't stop!",
];

/// Announcements shown when hype mode is switched on.
pub const HYPE_GREETINGS: &[&str] = &[
    "Hype mode engaged! Strap in, this chat just got louder.",
    "The dial goes to twelve now. Hype mode is ON.",
    "Quiet hours are cancelled — hype mode activated!",
    "Warning: enthusiasm levels exceeding safe limits. Hype mode on.",
    "The squad asked for energy. The squad receives energy.",
    "Hype protocols loaded. Expect exclamation marks.",
    "This chat is now operating at maximum velocity.",
    "Hype mode: because somebody has to keep morale up.",
    "Enthusiasm subsystem online. Buckle up.",
    "Big energy mode enabled. You were warned.",
];
