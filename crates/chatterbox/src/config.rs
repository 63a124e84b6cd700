//! TOML configuration loading and validation.
//!
//! The config file has three sections: `[db]` for the SQLite path,
//! `[bot]` for the bot's identity (name, aliases, admin ids), and an
//! optional `[tasks]` section for background task intervals. Missing
//! `[tasks]` values fall back to their defaults, so a minimal config
//! only needs a database path and a bot name.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub bot: BotConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Name the bot answers to. Messages containing it count as mentions.
    pub name: String,
    /// Additional names that count as mentions.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// User ids allowed to run admin actions through the event loop.
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TasksConfig {
    /// Seconds between autosave sweeps.
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
    /// Seconds between mood drift checks.
    #[serde(default = "default_mood_interval_secs")]
    pub mood_interval_secs: u64,
}

fn default_save_interval_secs() -> u64 {
    300
}
fn default_mood_interval_secs() -> u64 {
    3600
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: default_save_interval_secs(),
            mood_interval_secs: default_mood_interval_secs(),
        }
    }
}

impl BotConfig {
    /// True when the text mentions the bot by name, alias, or @-handle.
    pub fn is_mentioned(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        let name = self.name.to_lowercase();
        if lower.contains(&name) || lower.contains(&format!("@{}", name)) {
            return true;
        }
        self.aliases
            .iter()
            .any(|alias| lower.contains(&alias.to_lowercase()))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.bot.name.trim().is_empty() {
        anyhow::bail!("bot.name must not be empty");
    }

    if config.tasks.save_interval_secs == 0 {
        anyhow::bail!("tasks.save_interval_secs must be > 0");
    }

    if config.tasks.mood_interval_secs == 0 {
        anyhow::bail!("tasks.mood_interval_secs must be > 0");
    }

    Ok(config)
}
