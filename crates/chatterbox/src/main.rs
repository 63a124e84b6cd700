//! # Chatterbox CLI (`chatterbox`)
//!
//! The `chatterbox` binary is the primary interface for Chatterbox. It
//! provides commands for database initialization, corpus import and
//! export, chat statistics, admin actions, one-off generation, and the
//! long-running event loop.
//!
//! ## Usage
//!
//! ```bash
//! chatterbox --config ./config/chatterbox.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chatterbox init` | Create the SQLite database and run schema migrations |
//! | `chatterbox stats` | Show per-chat corpus and policy statistics |
//! | `chatterbox import <chat> <file>` | Bulk-load corpus lines from a text file |
//! | `chatterbox export <chat>` | Dump a chat's corpus as plain text |
//! | `chatterbox say <chat>` | Force-generate one message |
//! | `chatterbox set <chat> <action>` | Apply an admin action |
//! | `chatterbox run` | Start the stdin/stdout JSON event loop |
//!
//! ## Event loop protocol
//!
//! `chatterbox run` reads one JSON event per stdin line and writes one
//! JSON object per reply to stdout. Logs go to stderr.
//!
//! ```bash
//! echo '{"chat_id": 1, "user_id": 7, "text": "hello there"}' | chatterbox run
//! # => {"chat_id":1,"reply":"..."}   (when the bot decides to speak)
//! ```
//!
//! Admin actions ride the same stream with an `admin` field; they are
//! only honored for user ids listed in `bot.admin_ids`:
//!
//! ```bash
//! echo '{"chat_id": 1, "user_id": 7, "admin": "toggle-hype"}' | chatterbox run
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatterbox::config::{self, Config};
use chatterbox::db;
use chatterbox::export;
use chatterbox::import;
use chatterbox::migrate;
use chatterbox::oracle::{AdminOracle, ConfigAdmins};
use chatterbox::service::BotService;
use chatterbox::sqlite_store::SqliteStore;
use chatterbox::stats;
use chatterbox::tasks;

use chatterbox_core::policy::AdminAction;

/// Chatterbox — a chat bot that learns a group's voice and talks back.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/chatterbox.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "chatterbox",
    about = "Chatterbox — a chat bot that learns a group's voice and talks back",
    version,
    long_about = "Chatterbox accumulates each chat's messages into a per-chat corpus, trains a \
    word-level Markov model over it, and replies with generated text whose frequency and tone \
    follow a per-chat mood and policy. State persists in SQLite; the `run` command exposes a \
    line-delimited JSON event loop over stdin/stdout for embedding into any chat platform."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/chatterbox.toml`. Database, bot identity,
    /// and background task settings are read from this file.
    #[arg(long, global = true, default_value = "./config/chatterbox.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (chats,
    /// corpus_lines). This command is idempotent — running it multiple
    /// times is safe.
    Init,

    /// Show per-chat statistics.
    ///
    /// Corpus sizes, mood, response chance, hype and learning flags,
    /// and whether a trained model is ready.
    Stats {
        /// Restrict output to one chat id.
        #[arg(long)]
        chat: Option<i64>,
    },

    /// Bulk-load corpus lines from a text file.
    ///
    /// One message per line, UTF-8 only. Lines shorter than two
    /// characters after trimming are dropped, at most 1000 lines are
    /// taken per run, and the model is retrained afterwards.
    Import {
        /// Chat id to import into.
        chat: i64,

        /// Path to the text file.
        file: PathBuf,
    },

    /// Dump a chat's corpus as plain text.
    ///
    /// Writes a short header followed by the most recent corpus lines
    /// (at most 1000), numbered.
    Export {
        /// Chat id to export.
        chat: i64,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Force-generate one message for a chat.
    ///
    /// Skips the response-chance roll. Prints the generated text, or
    /// `(silence)` when the corpus cannot produce anything.
    Say {
        /// Chat id to generate for.
        chat: i64,

        /// Optional context text to steer generation.
        context: Option<String>,
    },

    /// Apply an admin action to a chat.
    ///
    /// Actions: `cycle-chance`, `toggle-replies`, `toggle-mentions`,
    /// `toggle-learning`, `toggle-hype`, `hype-up`, `hype-down`,
    /// `mood=<neutral|happy|grumpy|reflective|hyped>`,
    /// `disable=<seconds>`, `enable`, `train`, `clear`.
    Set {
        /// Chat id to act on.
        chat: i64,

        /// The action, e.g. `toggle-hype` or `mood=grumpy`.
        action: String,
    },

    /// Start the stdin/stdout JSON event loop.
    ///
    /// Reads one JSON event per line from stdin, writes replies as JSON
    /// lines to stdout, and runs the autosave and mood-cycle background
    /// tasks until stdin closes or an interrupt arrives.
    Run,
}

/// One inbound event on the `run` stream.
#[derive(Deserialize)]
struct InboundEvent {
    chat_id: i64,
    #[serde(default)]
    user_id: i64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    reply_to_bot: bool,
    /// Admin action string; when present, `text` is ignored.
    #[serde(default)]
    admin: Option<String>,
}

/// One generated reply on the `run` stream.
#[derive(Serialize)]
struct OutboundEvent {
    chat_id: i64,
    reply: String,
}

/// One rejection on the `run` stream. Denials and bad action strings
/// must reach the user, not just the stderr log.
#[derive(Serialize)]
struct OutboundError {
    chat_id: i64,
    error: String,
}

fn emit_error(chat_id: i64, message: String) {
    match serde_json::to_string(&OutboundError {
        chat_id,
        error: message,
    }) {
        Ok(json) => println!("{}", json),
        Err(err) => warn!(chat_id, error = %err, "failed to encode rejection"),
    }
}

/// Parse an admin action string as used by `set` and the event loop.
fn parse_action(raw: &str) -> Result<AdminAction> {
    let (name, arg) = match raw.split_once('=') {
        Some((name, arg)) => (name.trim(), Some(arg.trim())),
        None => (raw.trim(), None),
    };

    let action = match name {
        "cycle-chance" => AdminAction::CycleResponseChance,
        "toggle-replies" => AdminAction::ToggleReplies,
        "toggle-mentions" => AdminAction::ToggleMentions,
        "toggle-learning" => AdminAction::ToggleLearning,
        "toggle-hype" => AdminAction::ToggleHypeMode,
        "hype-up" => AdminAction::HypeIntensityUp,
        "hype-down" => AdminAction::HypeIntensityDown,
        "enable" => AdminAction::Enable,
        "train" => AdminAction::Retrain,
        "clear" => AdminAction::ClearHistory,
        "mood" => {
            let arg = arg.context("mood requires a value, e.g. mood=happy")?;
            AdminAction::SetMood(arg.parse()?)
        }
        "disable" => {
            let arg = arg.context("disable requires seconds, e.g. disable=600")?;
            AdminAction::DisableFor(arg.parse().context("disable seconds must be an integer")?)
        }
        other => anyhow::bail!("unknown admin action: '{}'", other),
    };
    Ok(action)
}

/// Connect, migrate, and load every persisted chat.
async fn open_service(cfg: Config) -> Result<Arc<BotService>> {
    let pool = db::connect(&cfg).await?;
    migrate::apply(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));
    Ok(Arc::new(BotService::load(cfg, store).await?))
}

async fn handle_event(
    service: &Arc<BotService>,
    oracle: &dyn AdminOracle,
    cancel: &CancellationToken,
    event: InboundEvent,
) {
    if let Some(raw) = event.admin {
        if !oracle.is_admin(event.chat_id, event.user_id).await {
            warn!(
                chat_id = event.chat_id,
                user_id = event.user_id,
                "admin action denied"
            );
            emit_error(event.chat_id, "admin action not allowed".to_string());
            return;
        }
        let action = match parse_action(&raw) {
            Ok(action) => action,
            Err(err) => {
                warn!(chat_id = event.chat_id, error = %err, "bad admin action");
                emit_error(event.chat_id, format!("bad admin action: {}", err));
                return;
            }
        };
        match service.admin_action(event.chat_id, action).await {
            Ok((_, Some(announcement))) => {
                match serde_json::to_string(&OutboundEvent {
                    chat_id: event.chat_id,
                    reply: announcement,
                }) {
                    Ok(json) => println!("{}", json),
                    Err(err) => warn!(chat_id = event.chat_id, error = %err, "failed to encode announcement"),
                }
            }
            Ok((_, None)) => {}
            Err(err) => {
                warn!(chat_id = event.chat_id, error = %err, "admin action failed");
                emit_error(event.chat_id, "admin action failed".to_string());
            }
        }
        return;
    }

    match service
        .on_message(event.chat_id, &event.text, event.reply_to_bot)
        .await
    {
        Ok(Some(reply)) => {
            let chat_id = event.chat_id;
            let cancel = cancel.clone();
            // The mood delay must not hold up the next inbound event,
            // and a pending reply dies quietly at shutdown.
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(reply.delay) => {}
                }
                match serde_json::to_string(&OutboundEvent {
                    chat_id,
                    reply: reply.text,
                }) {
                    Ok(json) => println!("{}", json),
                    Err(err) => warn!(chat_id, error = %err, "failed to encode reply"),
                }
            });
        }
        Ok(None) => {}
        Err(err) => {
            warn!(chat_id = event.chat_id, error = %err, "message handling failed");
        }
    }
}

async fn run_event_loop(cfg: Config) -> Result<()> {
    let service = open_service(cfg).await?;
    let oracle = ConfigAdmins::new(service.config().bot.admin_ids.clone());

    let cancel = CancellationToken::new();
    let handles = tasks::spawn(Arc::clone(&service), cancel.clone());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    info!("event loop started; reading JSON events from stdin");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let event: InboundEvent = match serde_json::from_str(line) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(error = %err, "ignoring malformed event");
                        continue;
                    }
                };
                handle_event(&service, &oracle, &cancel, event).await;
            }
        }
    }

    cancel.cancel();
    for handle in handles {
        let _ = handle.await;
    }
    let (saved, failed) = service.save_all().await;
    info!(saved, failed, "final save complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the `run` transport keeps stdout to itself.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Stats { chat } => {
            let service = open_service(cfg).await?;
            stats::run_stats(&service, chat).await?;
        }
        Commands::Import { chat, file } => {
            let service = open_service(cfg).await?;
            import::run_import(&service, chat, &file).await?;
        }
        Commands::Export { chat, output } => {
            let service = open_service(cfg).await?;
            export::run_export(&service, chat, output.as_deref()).await?;
        }
        Commands::Say { chat, context } => {
            let service = open_service(cfg).await?;
            match service.say(chat, context.as_deref().unwrap_or("")).await? {
                Some(text) => println!("{}", text),
                None => println!("(silence)"),
            }
            service.save_chat(chat).await?;
        }
        Commands::Set { chat, action } => {
            let service = open_service(cfg).await?;
            let action = parse_action(&action)?;
            let (policy, announcement) = service.admin_action(chat, action).await?;
            if let Some(announcement) = announcement {
                println!("{}", announcement);
            }
            println!(
                "Chat {}: chance {}%, replies {}, mentions {}, learning {}, hype {} (intensity {})",
                chat,
                policy.response_chance,
                if policy.allow_replies { "on" } else { "off" },
                if policy.allow_mentions { "on" } else { "off" },
                if policy.learning_enabled { "on" } else { "off" },
                if policy.hype_mode { "on" } else { "off" },
                policy.hype_intensity,
            );
        }
        Commands::Run => {
            run_event_loop(cfg).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatterbox_core::policy::Mood;

    #[test]
    fn test_parse_action_plain_names() {
        assert!(matches!(
            parse_action("cycle-chance").unwrap(),
            AdminAction::CycleResponseChance
        ));
        assert!(matches!(
            parse_action("toggle-hype").unwrap(),
            AdminAction::ToggleHypeMode
        ));
        assert!(matches!(parse_action("clear").unwrap(), AdminAction::ClearHistory));
        assert!(matches!(parse_action("train").unwrap(), AdminAction::Retrain));
    }

    #[test]
    fn test_parse_action_with_arguments() {
        assert!(matches!(
            parse_action("mood=grumpy").unwrap(),
            AdminAction::SetMood(Mood::Grumpy)
        ));
        assert!(matches!(
            parse_action("disable=600").unwrap(),
            AdminAction::DisableFor(600)
        ));
        assert!(matches!(
            parse_action(" mood = happy ").unwrap(),
            AdminAction::SetMood(Mood::Happy)
        ));
    }

    #[test]
    fn test_parse_action_rejects_garbage() {
        assert!(parse_action("explode").is_err());
        assert!(parse_action("mood").is_err());
        assert!(parse_action("mood=furious").is_err());
        assert!(parse_action("disable=soon").is_err());
    }
}
