//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Categorized; raw sqlx errors stop here        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReservationError (slotbook-service) ← Caller-facing taxonomy          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::borrow::Cow;

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Point lookup by id, uuid or reference misses
    /// - A compare-and-update finds the row in a different state
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The requested window overlaps a reservation that holds the slot.
    #[error("Slot conflict for provider {provider_id} at {window}")]
    SlotConflict { provider_id: String, window: String },

    /// Unique violation on the reservation's external id.
    #[error("Duplicate reservation: {0}")]
    DuplicateReservation(String),

    /// Unique violation on the human-readable reference code.
    #[error("Duplicate reference code: {0}")]
    DuplicateReference(String),

    /// Any other unique constraint violation.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - History entry referencing a non-existent reservation
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The write lock or a pooled connection could not be obtained in time.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY / SQLITE_LOCKED after `busy_timeout`
    /// - Pool acquire timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Pool already closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed (CHECK constraints, malformed SQL).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Corrupt error for a column that failed to decode.
    pub fn corrupt(column: &str, detail: impl std::fmt::Display) -> Self {
        DbError::Corrupt(format!("{column}: {detail}"))
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DbError::Timeout(_))
    }
}

/// Primary and extended SQLite result codes for lock contention:
/// BUSY, BUSY_RECOVERY, BUSY_SNAPSHOT, BUSY_TIMEOUT, LOCKED, LOCKED_SHAREDCACHE.
const LOCK_CODES: [&str; 6] = ["5", "261", "517", "773", "6", "262"];

fn is_lock_contention(code: Option<Cow<'_, str>>, message: &str) -> bool {
    code.is_some_and(|c| LOCK_CODES.iter().any(|lock| *lock == &*c))
        || message.contains("database is locked")
        || message.contains("database table is locked")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → lock codes → Timeout
///                               UNIQUE reservations.uuid → DuplicateReservation
///                               UNIQUE reservations.reference_code → DuplicateReference
///                               other constraints by message
/// sqlx::Error::PoolTimedOut   → DbError::Timeout
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if is_lock_contention(db_err.code(), msg) {
                    return DbError::Timeout(msg.to_string());
                }

                // SQLite constraint messages:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if let Some(field) = msg.split("UNIQUE constraint failed: ").nth(1) {
                    match field {
                        "reservations.uuid" => DbError::DuplicateReservation(field.to_string()),
                        "reservations.reference_code" => {
                            DbError::DuplicateReference(field.to_string())
                        }
                        _ => DbError::UniqueViolation {
                            field: field.to_string(),
                            value: "unknown".to_string(),
                        },
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::Timeout("timed out acquiring a pooled connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => DbError::corrupt(&index, source),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
