use rusqlite::{ErrorCode, OptionalExtension};
use thiserror::Error;

use super::PostStore;

/// A relayed post: Telegram channel post id and the Discord message it became
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub struct PostMapping {
    pub id: i64,
    pub source_message_id: i64,
    pub destination_message_id: String,
    pub created_at: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("post {source_message_id} or message {destination_message_id} is already mapped")]
    UniquenessViolation {
        source_message_id: i64,
        destination_message_id: String,
    },

    #[error("no mapping for post {0}")]
    NotFound(i64),

    #[error("database error: {0}")]
    Io(#[from] rusqlite::Error),
}

impl PostStore {
    /// Record a relayed post. Rejects, never overwrites, an existing mapping.
    pub async fn create(
        &self,
        source_message_id: i64,
        destination_message_id: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let result = conn.execute(
            "INSERT INTO posts (source_message_id, destination_message_id) VALUES (?1, ?2)",
            rusqlite::params![source_message_id, destination_message_id],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::UniquenessViolation {
                    source_message_id,
                    destination_message_id: destination_message_id.to_string(),
                })
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub async fn find_by_source(&self, source_message_id: i64) -> Result<PostMapping, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, source_message_id, destination_message_id, created_at
             FROM posts WHERE source_message_id = ?1",
            rusqlite::params![source_message_id],
            |row| {
                Ok(PostMapping {
                    id: row.get(0)?,
                    source_message_id: row.get(1)?,
                    destination_message_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(StoreError::NotFound(source_message_id))
    }
}
