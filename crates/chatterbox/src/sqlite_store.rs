//! SQLite-backed [`ChatStore`] implementation.
//!
//! Each chat maps to one row in `chats` plus its corpus window in
//! `corpus_lines`. Saving a snapshot replaces the corpus rows inside a
//! transaction, so a reader never observes a half-written window.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use chatterbox_core::policy::Mood;
use chatterbox_core::{ChatSnapshot, ChatStore};

/// SQLite implementation of the [`ChatStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[allow(dead_code)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_json_vec(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn load_all(&self) -> Result<Vec<ChatSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT chat_id, mood, message_count, last_activity, model_version,
                   policy_json, custom_responses_json, used_endings_json
            FROM chats
            ORDER BY chat_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            let chat_id: i64 = row.get("chat_id");

            let lines = sqlx::query(
                "SELECT line FROM corpus_lines WHERE chat_id = ? ORDER BY seq",
            )
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;
            let messages: Vec<String> = lines.iter().map(|r| r.get("line")).collect();

            let mood_raw: String = row.get("mood");
            let policy_raw: String = row.get("policy_json");
            let custom_raw: String = row.get("custom_responses_json");
            let endings_raw: String = row.get("used_endings_json");

            snapshots.push(ChatSnapshot {
                chat_id,
                messages,
                message_count: row.get::<i64, _>("message_count").max(0) as u64,
                mood: Mood::from_str(&mood_raw).unwrap_or_default(),
                policy: serde_json::from_str(&policy_raw).unwrap_or_default(),
                custom_responses: parse_json_vec(&custom_raw),
                used_endings: parse_json_vec(&endings_raw),
                last_activity: row.get("last_activity"),
                model_version: row.get("model_version"),
            });
        }

        Ok(snapshots)
    }

    async fn save(&self, snapshot: &ChatSnapshot) -> Result<()> {
        let policy_json = serde_json::to_string(&snapshot.policy)?;
        let custom_json = serde_json::to_string(&snapshot.custom_responses)?;
        let endings_json = serde_json::to_string(&snapshot.used_endings)?;
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chats (chat_id, mood, message_count, last_activity, model_version,
                               policy_json, custom_responses_json, used_endings_json, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                mood = excluded.mood,
                message_count = excluded.message_count,
                last_activity = excluded.last_activity,
                model_version = excluded.model_version,
                policy_json = excluded.policy_json,
                custom_responses_json = excluded.custom_responses_json,
                used_endings_json = excluded.used_endings_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(snapshot.chat_id)
        .bind(snapshot.mood.to_string())
        .bind(snapshot.message_count as i64)
        .bind(snapshot.last_activity)
        .bind(&snapshot.model_version)
        .bind(&policy_json)
        .bind(&custom_json)
        .bind(&endings_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM corpus_lines WHERE chat_id = ?")
            .bind(snapshot.chat_id)
            .execute(&mut *tx)
            .await?;

        for (i, line) in snapshot.messages.iter().enumerate() {
            sqlx::query("INSERT INTO corpus_lines (chat_id, seq, line) VALUES (?, ?, ?)")
                .bind(snapshot.chat_id)
                .bind(i as i64)
                .bind(line)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, chat_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM corpus_lines WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM chats WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatterbox_core::policy::ChatPolicy;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn sample_snapshot(chat_id: i64) -> ChatSnapshot {
        ChatSnapshot {
            chat_id,
            messages: vec!["first line".to_string(), "second line".to_string()],
            message_count: 7,
            mood: Mood::Grumpy,
            policy: ChatPolicy {
                response_chance: 40,
                hype_mode: true,
                ..ChatPolicy::default()
            },
            custom_responses: vec!["canned".to_string()],
            used_endings: vec!["an ending".to_string()],
            last_activity: 1234,
            model_version: "abc123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = memory_store().await;
        store.save(&sample_snapshot(10)).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        let snapshot = &loaded[0];
        assert_eq!(snapshot.chat_id, 10);
        assert_eq!(snapshot.messages, vec!["first line", "second line"]);
        assert_eq!(snapshot.message_count, 7);
        assert_eq!(snapshot.mood, Mood::Grumpy);
        assert_eq!(snapshot.policy.response_chance, 40);
        assert!(snapshot.policy.hype_mode);
        assert_eq!(snapshot.custom_responses, vec!["canned"]);
        assert_eq!(snapshot.used_endings, vec!["an ending"]);
        assert_eq!(snapshot.last_activity, 1234);
        assert_eq!(snapshot.model_version, "abc123");
    }

    #[tokio::test]
    async fn test_save_replaces_corpus_rows() {
        let store = memory_store().await;
        store.save(&sample_snapshot(10)).await.unwrap();

        let mut updated = sample_snapshot(10);
        updated.messages = vec!["only line".to_string()];
        store.save(&updated).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].messages, vec!["only line"]);
    }

    #[tokio::test]
    async fn test_delete_removes_chat_and_corpus() {
        let store = memory_store().await;
        store.save(&sample_snapshot(10)).await.unwrap();
        store.save(&sample_snapshot(11)).await.unwrap();

        store.delete(10).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].chat_id, 11);

        let orphans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM corpus_lines WHERE chat_id = 10")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_corrupt_policy_json_falls_back_to_defaults() {
        let store = memory_store().await;
        store.save(&sample_snapshot(10)).await.unwrap();

        sqlx::query("UPDATE chats SET policy_json = 'not json' WHERE chat_id = 10")
            .execute(store.pool())
            .await
            .unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded[0].policy.response_chance, 5);
        assert!(loaded[0].policy.learning_enabled);
    }
}
