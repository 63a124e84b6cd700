//! Database schema creation.
//!
//! All statements use `CREATE TABLE IF NOT EXISTS`, so migrations are
//! idempotent and safe to run on every startup. The schema splits chat
//! metadata (`chats`) from the message history (`corpus_lines`), keyed
//! by chat id.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per chat; the corpus lives in its own table so a long
    // history never bloats the chat row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chats (
            chat_id INTEGER PRIMARY KEY,
            mood TEXT NOT NULL DEFAULT 'neutral',
            message_count INTEGER NOT NULL DEFAULT 0,
            last_activity INTEGER NOT NULL DEFAULT 0,
            model_version TEXT NOT NULL DEFAULT '',
            policy_json TEXT NOT NULL DEFAULT '{}',
            custom_responses_json TEXT NOT NULL DEFAULT '[]',
            used_endings_json TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS corpus_lines (
            chat_id INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            line TEXT NOT NULL,
            PRIMARY KEY (chat_id, seq),
            FOREIGN KEY (chat_id) REFERENCES chats(chat_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_corpus_lines_chat_id ON corpus_lines(chat_id)")
        .execute(pool)
        .await?;

    Ok(())
}
