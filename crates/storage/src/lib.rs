use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tokio::sync::broadcast;
use tracing::warn;

use shared::protocol::StatusDocument;

/// Logical key of the shared public status document in the fallback store.
pub const PUBLIC_STATUS_KEY: &str = "planning_public";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification emitted whenever a document key is overwritten. The local
/// stand-in for the original's cross-tab storage change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
}

/// Sqlite-backed key-value store of serialized status documents. Serves as
/// the offline/demo fallback channel: each write fully replaces the
/// document under its key and notifies same-process subscribers.
#[derive(Clone)]
pub struct LocalStore {
    pool: Pool<Sqlite>,
    changes: broadcast::Sender<StoreChange>,
}

impl LocalStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self { pool, changes };
        store.ensure_documents_table().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_documents_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS status_documents (
                doc_key    TEXT PRIMARY KEY,
                body       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure status_documents table exists")?;
        Ok(())
    }

    /// Full replacement of the document under `key`; there is no history.
    pub async fn put(&self, key: &str, body: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO status_documents (doc_key, body, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(doc_key) DO UPDATE SET body=excluded.body, updated_at=excluded.updated_at",
        )
        .bind(key)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write document '{key}'"))?;

        // Receivers may not exist yet; a missed notification only matters
        // once someone subscribes, and subscribers read current state first.
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
        });
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT body FROM status_documents WHERE doc_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read document '{key}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    /// Reads and leniently decodes the document under `key`. A stored body
    /// that no longer parses as JSON is reported absent rather than
    /// poisoning every subsequent read.
    pub async fn get_document(&self, key: &str) -> Result<Option<StatusDocument>> {
        let Some(body) = self.get(key).await? else {
            return Ok(None);
        };
        match StatusDocument::from_json_str(&body) {
            Ok(document) => Ok(Some(document)),
            Err(err) => {
                warn!(key, error = %err, "discarding unparseable stored document");
                Ok(None)
            }
        }
    }

    pub async fn put_document(&self, key: &str, document: &StatusDocument) -> Result<()> {
        let body = serde_json::to_string(document)
            .with_context(|| format!("failed to serialize document '{key}'"))?;
        self.put(key, &body).await
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;
    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
