//! # Reservation History Repository
//!
//! Append-only audit trail. Entries are written inside the transaction of
//! the mutation they describe, so a reservation change and its record
//! commit or roll back together.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use slotbook_core::{Actor, ActorRole, ChangeType, HistoryEntry, NewHistoryEntry};

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    reservation_id: i64,
    change_type: String,
    before_json: Option<String>,
    after_json: String,
    actor_role: ActorRole,
    actor_id: Option<String>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_domain(self) -> DbResult<HistoryEntry> {
        let before = self
            .before_json
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| DbError::corrupt("before_json", e))?;
        let after =
            serde_json::from_str(&self.after_json).map_err(|e| DbError::corrupt("after_json", e))?;

        Ok(HistoryEntry {
            id: self.id,
            reservation_id: self.reservation_id,
            change_type: self
                .change_type
                .parse::<ChangeType>()
                .map_err(|e| DbError::corrupt("change_type", e))?,
            before,
            after,
            actor: Actor {
                role: self.actor_role,
                id: self.actor_id,
            },
            reason: self.reason,
            created_at: self.created_at,
        })
    }
}

/// Repository for `reservation_history`.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    /// Creates a new HistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Appends an entry on the caller's connection and returns its id.
    pub async fn append(&self, conn: &mut SqliteConnection, entry: &NewHistoryEntry) -> DbResult<i64> {
        let before = entry
            .before
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let after = serde_json::to_string(&entry.after).map_err(|e| DbError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO reservation_history (
                reservation_id, change_type, before_json, after_json,
                actor_role, actor_id, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(entry.reservation_id)
        .bind(entry.change_type.as_str())
        .bind(before)
        .bind(after)
        .bind(entry.actor.role)
        .bind(entry.actor.id.as_deref())
        .bind(entry.reason.as_deref())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(
            reservation_id = entry.reservation_id,
            change_type = entry.change_type.as_str(),
            actor = entry.actor.role.as_str(),
            "History appended"
        );

        Ok(result.last_insert_rowid())
    }

    /// All entries for a reservation, newest first.
    pub async fn for_reservation(&self, reservation_id: i64) -> DbResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT * FROM reservation_history
            WHERE reservation_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_domain).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
