//! Export a chat's corpus as plain text.
//!
//! Produces the human-readable dump built by the engine: a short
//! header followed by the most recent corpus lines, numbered.

use anyhow::Result;
use std::path::Path;

use crate::service::BotService;

/// Export one chat's corpus.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(service: &BotService, chat_id: i64, output: Option<&Path>) -> Result<()> {
    let Some(text) = service.export(chat_id).await else {
        anyhow::bail!("no state for chat {}", chat_id);
    };

    match output {
        Some(path) => {
            std::fs::write(path, &text)?;
            println!("Exported chat {} to {}", chat_id, path.display());
        }
        None => {
            print!("{}", text);
        }
    }

    Ok(())
}
