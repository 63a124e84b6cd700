//! Import corpus lines from a text file.
//!
//! One message per line, UTF-8 only. The engine trims each line, drops
//! anything shorter than two characters, caps the batch at its import
//! limit, and forces a retrain when at least one line lands.

use anyhow::{Context, Result};
use std::path::Path;

use crate::service::BotService;

/// Refuse files larger than this; the import limit makes anything
/// bigger pointless anyway.
const MAX_IMPORT_BYTES: u64 = 1024 * 1024;

pub async fn run_import(service: &BotService, chat_id: i64, file: &Path) -> Result<()> {
    let size = std::fs::metadata(file)
        .with_context(|| format!("Failed to stat import file: {}", file.display()))?
        .len();
    if size > MAX_IMPORT_BYTES {
        anyhow::bail!(
            "import file too large: {} bytes (limit {})",
            size,
            MAX_IMPORT_BYTES
        );
    }

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {}", file.display()))?;

    let imported = service.import(chat_id, content.lines()).await?;
    println!("Imported {} lines into chat {}", imported, chat_id);
    Ok(())
}
