pub mod posts;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub use posts::StoreError;

/// SQLite-backed mapping from Telegram post ids to Discord message ids
#[derive(Clone)]
pub struct PostStore {
    conn: Arc<Mutex<Connection>>,
}

impl PostStore {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        // Migrate before wrapping in the async Mutex
        Self::run_migrations(&conn)?;

        info!("Post store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run raw SQL against the shared connection (for testing)
    #[cfg(test)]
    pub async fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.lock().await.execute_batch(sql)
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_message_id INTEGER NOT NULL UNIQUE,
                destination_message_id TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )
        .context("Failed to migrate posts table")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent_and_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.db");

        {
            let store = PostStore::open(&path).unwrap();
            store.create(42, "D1").await.unwrap();
        }

        let store = PostStore::open(&path).unwrap();
        let mapping = store.find_by_source(42).await.unwrap();
        assert_eq!(mapping.destination_message_id, "D1");
    }

    #[test]
    fn test_open_fails_for_missing_directory() {
        let err = PostStore::open(Path::new("/nonexistent-dir/sub/posts.db"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to open database"));
    }
}
