//! # Validation Module
//!
//! Input validation for reservation requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer (outside this workspace)                           │
//! │  └── Deserialization, auth                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: ReservationService                                           │
//! │  └── THIS MODULE: shape checks that name the offending field          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (uuid, reference_code)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use slotbook_core::validation::{validate_id, validate_currency};
//!
//! validate_id("provider_id", "prov-42").unwrap();
//! validate_currency("EUR").unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{GuestContact, SlotWindow};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted identifier from a collaborator system.
pub const MAX_ID_LEN: usize = 64;

/// Longest accepted free-text field (notes, cancellation reason).
pub const MAX_TEXT_LEN: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an identifier handed to us by another system (provider, slot,
/// service, customer).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_ID_LEN`] characters
/// - Letters, digits, `-`, `_`, `.`, `:` only
///
/// ## Example
/// ```rust
/// use slotbook_core::validation::validate_id;
///
/// assert!(validate_id("slot_id", "slot-2026-03-02-10").is_ok());
/// assert!(validate_id("slot_id", "").is_err());
/// assert!(validate_id("slot_id", "has space").is_err());
/// ```
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    // Blank reads as missing; any other whitespace fails the charset below,
    // since the id is stored exactly as given.
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, '-', '_', '.', ':'".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name (service name, guest name).
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates optional free text.
pub fn validate_text(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(text) if text.len() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates an e-mail address loosely: one `@`, something on both sides,
/// a dot in the domain.
pub fn validate_email(field: &str, email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !well_formed || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be an e-mail address".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number: digits with optional leading `+` and the usual
/// separators, 7 to 20 digits.
pub fn validate_phone(field: &str, phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);

    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if !allowed || !(7..=20).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a phone number".to_string(),
        });
    }

    Ok(())
}

/// Validates guest contact details.
pub fn validate_guest(guest: &GuestContact) -> ValidationResult<()> {
    validate_name("guest.name", &guest.name)?;
    validate_email("guest.email", &guest.email)?;
    if let Some(phone) = &guest.phone {
        validate_phone("guest.phone", phone)?;
    }
    Ok(())
}

/// Validates an ISO 4217 currency code (three upper-case ASCII letters).
///
/// ## Example
/// ```rust
/// use slotbook_core::validation::validate_currency;
///
/// assert!(validate_currency("USD").is_ok());
/// assert!(validate_currency("usd").is_err());
/// assert!(validate_currency("DOLLAR").is_err());
/// ```
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter ISO 4217 code".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an amount that may be zero but not negative (prices, tips).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (a fraction in `[0, 1]`)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Window Validators
// =============================================================================

/// Validates that a window lasts exactly `expected_minutes`.
pub fn validate_duration(window: &SlotWindow, expected_minutes: i64) -> ValidationResult<()> {
    let actual = window.duration();
    if chrono::Duration::try_minutes(expected_minutes) != Some(actual) {
        return Err(ValidationError::WrongDuration {
            field: "window".to_string(),
            expected_minutes,
            actual_minutes: actual.num_minutes(),
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (external reservation id).
///
/// ## Example
/// ```rust
/// use slotbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "uuid".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "uuid".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
