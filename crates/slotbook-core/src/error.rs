//! # Error Types
//!
//! Domain-specific error types for slotbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  slotbook-core errors (this file)                                      │
//! │  ├── ValidationError  - Malformed input, names the offending field     │
//! │  ├── PricingError     - Malformed monetary inputs                      │
//! │  ├── TransitionError  - Unknown status / illegal lifecycle edge        │
//! │  └── CoreError        - Union of the three                             │
//! │                                                                         │
//! │  slotbook-db errors (separate crate)                                   │
//! │  └── DbError          - Translated storage failures                    │
//! │                                                                         │
//! │  slotbook-service errors (separate crate)                              │
//! │  └── ReservationError - The taxonomy callers see                       │
//! │                                                                         │
//! │  Flow: core errors ─┐                                                  │
//! │        DbError ─────┴─► ReservationError ─► API layer                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Union of the pure-logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid pricing input: {0}")]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so an API layer can point the
/// caller at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed e-mail).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A time window whose end is not after its start.
    #[error("{field} must end after it starts")]
    EmptyWindow { field: String },

    /// A window whose length differs from what the service requires.
    #[error("{field} must last {expected_minutes} minutes, got {actual_minutes}")]
    WrongDuration {
        field: String,
        expected_minutes: i64,
        actual_minutes: i64,
    },

    /// A referenced party exists but cannot take part in a reservation.
    #[error("{field} is not active")]
    Inactive { field: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::EmptyWindow { field }
            | ValidationError::WrongDuration { field, .. }
            | ValidationError::Inactive { field } => field,
        }
    }
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Rejected pricing inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("service price {price} must not be negative")]
    NegativePrice { price: String },

    #[error("discount {discount} must not be negative")]
    NegativeDiscount { discount: String },

    #[error("discount {discount} exceeds service price {price}")]
    DiscountExceedsPrice { discount: String, price: String },

    /// Tax rate outside `[0, 1]`, reported in basis points.
    #[error("tax rate {bps} bps is outside 0..=10000")]
    TaxRateOutOfRange { bps: u32 },

    #[error("tip {tip} must not be negative")]
    NegativeTip { tip: String },

    #[error("currency '{code}' is not a three-letter ISO 4217 code")]
    InvalidCurrency { code: String },

    /// A sum that does not fit in an `i64` number of cents.
    #[error("{field} exceeds the largest representable amount")]
    AmountTooLarge { field: String },
}

// =============================================================================
// Transition Error
// =============================================================================

/// Lifecycle violations.
///
/// Statuses are carried in their wire form (`"in_progress"`,
/// `"cancelled_by_customer"`, ...) so the same error serves reservation and
/// payment lifecycles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A status string that is not a member of the enumeration.
    #[error("invalid status: '{0}'")]
    InvalidStatus(String),

    /// The requested edge is not in the transition table.
    #[error("illegal transition {from} -> {to} (allowed: {allowed:?})")]
    IllegalTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "provider_id".to_string(),
        };
        assert_eq!(err.to_string(), "provider_id is required");
        assert_eq!(err.field(), "provider_id");

        let err = ValidationError::WrongDuration {
            field: "window".to_string(),
            expected_minutes: 30,
            actual_minutes: 45,
        };
        assert_eq!(err.to_string(), "window must last 30 minutes, got 45");
    }

    #[test]
    fn test_illegal_transition_message() {
        let err = TransitionError::IllegalTransition {
            from: "completed".to_string(),
            to: "pending".to_string(),
            allowed: vec![],
        };
        assert_eq!(
            err.to_string(),
            "illegal transition completed -> pending (allowed: [])"
        );
    }

    #[test]
    fn test_conversions_into_core_error() {
        let core: CoreError = PricingError::TaxRateOutOfRange { bps: 12_000 }.into();
        assert!(matches!(core, CoreError::Pricing(_)));

        let core: CoreError = TransitionError::InvalidStatus("archived".to_string()).into();
        assert!(matches!(core, CoreError::Transition(_)));
    }
}
