//! # Reservation Errors
//!
//! The caller-facing error taxonomy.
//!
//! ## Layering
//! ```text
//! ValidationError ─┐
//! PricingError ────┤  (slotbook-core)
//! TransitionError ─┤
//!                  ├──► ReservationError ──► caller
//! DbError ─────────┤  (slotbook-db: raw sqlx errors never get this far)
//! LookupError ─────┘  (collaborators)
//! ```
//!
//! ## Retry Policy
//! Only [`ReservationError::Timeout`] is retryable. Everything else needs the
//! caller to change the input or re-read the reservation first.

use thiserror::Error;

use crate::directory::LookupError;
use slotbook_core::{PricingError, TransitionError, ValidationError};
use slotbook_db::DbError;

/// Errors returned by [`ReservationService`](crate::ReservationService).
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Malformed input; names the offending field.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The window overlaps a reservation that holds the slot.
    #[error("Slot conflict: provider {provider_id} is already booked during {window}")]
    SlotConflict { provider_id: String, window: String },

    /// The lifecycle table has no such edge.
    #[error("Illegal transition {from} -> {to} (allowed: {allowed:?})")]
    IllegalTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    /// A status string that is not a member of the enumeration.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate reservation: {0}")]
    DuplicateReservation(String),

    #[error("Duplicate reference code: {0}")]
    DuplicateReference(String),

    /// Timing, status or pricing change on a completed, cancelled or
    /// no-show reservation.
    #[error("Reservation {reservation_id} is {status} and can no longer be modified")]
    CannotModifyTerminal { reservation_id: i64, status: String },

    /// Cancellation requested outside `pending` / `confirmed`.
    #[error("Reservation {reservation_id} cannot be cancelled while {status}")]
    CancellationNotAllowed { reservation_id: i64, status: String },

    /// Lock wait or storage timeout. Safe to retry with backoff.
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid pricing input: {0}")]
    InvalidPricingInput(#[from] PricingError),

    /// A collaborator lookup failed.
    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    /// Storage failure with no more specific meaning.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReservationError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        ReservationError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Whether the caller may retry the identical request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::Timeout(_))
    }
}

impl From<TransitionError> for ReservationError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidStatus(status) => ReservationError::InvalidStatus(status),
            TransitionError::IllegalTransition { from, to, allowed } => {
                ReservationError::IllegalTransition { from, to, allowed }
            }
        }
    }
}

/// ## Error Mapping
/// ```text
/// DbError::NotFound              → NotFound
/// DbError::SlotConflict          → SlotConflict
/// DbError::DuplicateReservation  → DuplicateReservation
/// DbError::DuplicateReference    → DuplicateReference
/// DbError::Timeout               → Timeout
/// Other                          → Storage
/// ```
impl From<DbError> for ReservationError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ReservationError::NotFound { entity, id },
            DbError::SlotConflict {
                provider_id,
                window,
            } => ReservationError::SlotConflict {
                provider_id,
                window,
            },
            DbError::DuplicateReservation(msg) => ReservationError::DuplicateReservation(msg),
            DbError::DuplicateReference(msg) => ReservationError::DuplicateReference(msg),
            DbError::Timeout(msg) => ReservationError::Timeout(msg),
            other => ReservationError::Storage(other.to_string()),
        }
    }
}

impl From<LookupError> for ReservationError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Timeout(msg) => ReservationError::Timeout(msg),
            LookupError::Unavailable(msg) => ReservationError::Unavailable(msg),
        }
    }
}

/// Result type for service operations.
pub type ReservationResult<T> = Result<T, ReservationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeout_is_retryable() {
        assert!(ReservationError::Timeout("busy".into()).is_retryable());

        let others = [
            ReservationError::SlotConflict {
                provider_id: "p".into(),
                window: "w".into(),
            },
            ReservationError::not_found("Reservation", 1),
            ReservationError::CannotModifyTerminal {
                reservation_id: 1,
                status: "completed".into(),
            },
            ReservationError::Unavailable("down".into()),
            ReservationError::Storage("disk".into()),
            ReservationError::DuplicateReference("x".into()),
        ];
        for err in others {
            assert!(!err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_db_errors_are_translated() {
        assert!(matches!(
            ReservationError::from(DbError::Timeout("locked".into())),
            ReservationError::Timeout(_)
        ));
        assert!(matches!(
            ReservationError::from(DbError::DuplicateReference("r".into())),
            ReservationError::DuplicateReference(_)
        ));
        assert!(matches!(
            ReservationError::from(DbError::Corrupt("status: ?".into())),
            ReservationError::Storage(_)
        ));
    }

    #[test]
    fn test_transition_errors_keep_allowed_set() {
        let err: ReservationError = TransitionError::IllegalTransition {
            from: "completed".into(),
            to: "pending".into(),
            allowed: vec![],
        }
        .into();
        assert!(matches!(err, ReservationError::IllegalTransition { allowed, .. } if allowed.is_empty()));
    }
}
