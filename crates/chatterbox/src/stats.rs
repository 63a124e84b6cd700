//! Chat statistics overview.
//!
//! A quick summary of every chat the bot knows: corpus sizes, mood,
//! response chance, and whether a trained model is ready. Used by
//! `chatterbox stats` to check that learning and retraining are
//! working as expected.

use anyhow::Result;

use crate::service::BotService;

/// Run the stats command: summarize loaded chats and print a table.
pub async fn run_stats(service: &BotService, chat: Option<i64>) -> Result<()> {
    let mut stats = service.stats().await;
    if let Some(chat_id) = chat {
        stats.retain(|s| s.chat_id == chat_id);
        if stats.is_empty() {
            anyhow::bail!("no state for chat {}", chat_id);
        }
    }

    println!("Chatterbox — Chat Stats");
    println!("=======================");
    println!();

    if stats.is_empty() {
        println!("  No chats loaded.");
        println!();
        return Ok(());
    }

    println!(
        "  {:<12} {:>7} {:>8} {:>11} {:>7} {:>5} {:>8} {:>9}   {}",
        "CHAT", "STORED", "SEEN", "MOOD", "CHANCE", "HYPE", "LEARNING", "MODEL", "LAST ACTIVITY"
    );
    println!("  {}", "-".repeat(92));

    let now = chrono::Utc::now().timestamp();
    for s in &stats {
        let model = if s.model_version.is_empty() {
            "-".to_string()
        } else {
            // The full digest is noise here; the prefix identifies it.
            format!("ready:{}", &s.model_version[..8.min(s.model_version.len())])
        };
        let sleeping = if s.disabled_until > now {
            format!("  (sleeping {}s)", s.disabled_until - now)
        } else {
            String::new()
        };
        println!(
            "  {:<12} {:>7} {:>8} {:>11} {:>6}% {:>5} {:>8} {:>9}   {}{}",
            s.chat_id,
            s.stored,
            s.seen,
            s.mood.to_string(),
            s.response_chance,
            if s.hype_mode { "on" } else { "off" },
            if s.learning_enabled { "on" } else { "off" },
            model,
            format_ts_relative(s.last_activity),
            sleeping,
        );
    }

    println!();
    Ok(())
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    if ts == 0 {
        return "never".to_string();
    }

    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
