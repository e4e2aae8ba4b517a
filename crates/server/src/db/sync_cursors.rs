//! Sync cursor repository: the last watermark pulled from each peer.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use rescue_map_core::{SyncCursor, timestamp};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct SyncCursorRow {
    peer: String,
    watermark: String,
    updated_at: String,
}

impl TryFrom<SyncCursorRow> for SyncCursor {
    type Error = RepositoryError;

    fn try_from(row: SyncCursorRow) -> Result<Self, Self::Error> {
        let parse = |value: &str, column: &str| {
            timestamp::parse(value).map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "sync cursor {}: invalid {column}: {e}",
                    row.peer
                ))
            })
        };

        Ok(Self {
            watermark: parse(&row.watermark, "watermark")?,
            updated_at: parse(&row.updated_at, "updated_at")?,
            peer: row.peer,
        })
    }
}

/// Repository for sync cursor operations.
pub struct SyncCursorRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SyncCursorRepository<'a> {
    /// Create a new sync cursor repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the cursor stored for a peer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored timestamp is invalid.
    pub async fn get(&self, peer: &str) -> Result<Option<SyncCursor>, RepositoryError> {
        let row = sqlx::query_as::<_, SyncCursorRow>(
            "SELECT peer, watermark, updated_at FROM sync_cursors WHERE peer = ?",
        )
        .bind(peer)
        .fetch_optional(self.pool)
        .await?;

        row.map(SyncCursor::try_from).transpose()
    }

    /// Store the watermark for a peer, creating or replacing its cursor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn advance(
        &self,
        peer: &str,
        watermark: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sync_cursors (peer, watermark, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (peer) DO UPDATE SET
                watermark = excluded.watermark,
                updated_at = excluded.updated_at
            ",
        )
        .bind(peer)
        .bind(timestamp::format(watermark))
        .bind(timestamp::format(updated_at))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// List all cursors, ordered by peer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored timestamp is invalid.
    pub async fn list(&self) -> Result<Vec<SyncCursor>, RepositoryError> {
        let rows = sqlx::query_as::<_, SyncCursorRow>(
            "SELECT peer, watermark, updated_at FROM sync_cursors ORDER BY peer",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(SyncCursor::try_from).collect()
    }
}
