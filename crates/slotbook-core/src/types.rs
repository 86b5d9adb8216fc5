//! # Domain Types
//!
//! Core domain types used throughout Slotbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │    Reservation      │   │   SlotWindow    │   │  HistoryEntry   │   │
//! │  │  ─────────────────  │   │  ─────────────  │   │  ─────────────  │   │
//! │  │  id (i64, storage)  │   │  start (UTC)    │   │  reservation_id │   │
//! │  │  uuid (external)    │   │  end   (UTC)    │   │  change_type    │   │
//! │  │  reference_code     │   │  half-open      │   │  before / after │   │
//! │  │  provider_id        │   └─────────────────┘   │  actor, reason  │   │
//! │  │  customer           │                         └─────────────────┘   │
//! │  │  window, status     │   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │  pricing, tip       │   │   CustomerRef   │   │      Actor      │   │
//! │  │  cancellation       │   │  Registered(id) │   │  role + id      │   │
//! │  └─────────────────────┘   │  Guest(contact) │   └─────────────────┘   │
//! │                            └─────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Triple-Key Identity
//! Every reservation has:
//! - `id`: storage-assigned integer, used for relations and locking
//! - `uuid`: opaque external identifier, safe to hand out
//! - `reference_code`: short code a customer can read over the phone

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::PricingBreakdown;
use crate::status::{CancelledBy, PaymentStatus, ReservationStatus};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 0.0001
/// A fractional rate `0.08` is `800` bps; the legal range `[0, 1]` is
/// `[0, 10000]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Parses a fractional rate such as `"0.08"` or `"0.0825"`.
    ///
    /// ## Example
    /// ```rust
    /// use slotbook_core::types::TaxRate;
    ///
    /// assert_eq!(TaxRate::parse_fraction("0.08").unwrap().bps(), 800);
    /// assert_eq!(TaxRate::parse_fraction("1").unwrap().bps(), 10000);
    /// assert!(TaxRate::parse_fraction("0.00001").is_none());
    /// ```
    pub fn parse_fraction(s: &str) -> Option<Self> {
        let (whole, frac) = match s.trim().split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s.trim(), ""),
        };

        if whole.is_empty()
            || frac.len() > 4
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let whole: u32 = whole.parse().ok()?;
        let padded = format!("{:0<4}", frac);
        let frac: u32 = padded.parse().ok()?;

        whole.checked_mul(10_000)?.checked_add(frac).map(TaxRate)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Slot Window
// =============================================================================

/// A half-open time window `[start, end)`.
///
/// ## Overlap Rule
/// ```text
/// a overlaps b  ⇔  a.start < b.end  AND  a.end > b.start
///
/// 10:00 ──────── 10:30
///          10:15 ──────── 10:45      overlap
///                10:30 ──────── 11:00  back-to-back, NO overlap
/// ```
///
/// Sub-second precision is dropped on construction so that what is stored is
/// exactly what was checked. Deserialization goes through [`SlotWindow::new`]
/// as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SlotWindow {
    #[ts(as = "String")]
    start: DateTime<Utc>,
    #[ts(as = "String")]
    end: DateTime<Utc>,
}

impl SlotWindow {
    /// Creates a window, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        let start = start.trunc_subsecs(0);
        let end = end.trunc_subsecs(0);

        if end <= start {
            return Err(ValidationError::EmptyWindow {
                field: "window".to_string(),
            });
        }

        Ok(SlotWindow { start, end })
    }

    /// Creates a window from a start and a length in minutes.
    ///
    /// A length that would run past the representable calendar is reported
    /// as `InvalidFormat` on `window`.
    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> Result<Self, ValidationError> {
        let end = Duration::try_minutes(minutes)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "window".to_string(),
                reason: format!("a length of {minutes} minutes is out of range"),
            })?;
        SlotWindow::new(start, end)
    }

    #[inline]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length in whole minutes (truncated).
    pub fn minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// The half-open overlap predicate. Storage evaluates the same rule in SQL.
    pub fn overlaps(&self, other: &SlotWindow) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl<'de> Deserialize<'de> for SlotWindow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawWindow {
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        }

        let raw = RawWindow::deserialize(deserializer)?;
        SlotWindow::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for SlotWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

// =============================================================================
// Parties
// =============================================================================

/// Inline contact details for a reservation made without an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuestContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Who the reservation is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerRef {
    /// A customer known to the identity system.
    Registered { customer_id: String },
    /// An unauthenticated guest.
    Guest(GuestContact),
}

impl CustomerRef {
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            CustomerRef::Registered { customer_id } => Some(customer_id),
            CustomerRef::Guest(_) => None,
        }
    }

    pub fn guest(&self) -> Option<&GuestContact> {
        match self {
            CustomerRef::Registered { .. } => None,
            CustomerRef::Guest(contact) => Some(contact),
        }
    }
}

/// Role of whoever performs a mutation.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Provider,
    /// Automated jobs and back-office tooling.
    System,
}

impl ActorRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Provider => "provider",
            ActorRole::System => "system",
        }
    }

    /// Which cancelled variant a cancellation by this role produces.
    ///
    /// System cancellations are recorded against the provider side.
    pub const fn cancels_as(&self) -> CancelledBy {
        match self {
            ActorRole::Customer => CancelledBy::Customer,
            ActorRole::Provider | ActorRole::System => CancelledBy::Provider,
        }
    }
}

/// The party performing a mutation, recorded in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub role: ActorRole,
    pub id: Option<String>,
}

impl Actor {
    pub fn customer(id: impl Into<String>) -> Self {
        Actor {
            role: ActorRole::Customer,
            id: Some(id.into()),
        }
    }

    /// A customer without an account.
    pub fn guest() -> Self {
        Actor {
            role: ActorRole::Customer,
            id: None,
        }
    }

    pub fn provider(id: impl Into<String>) -> Self {
        Actor {
            role: ActorRole::Provider,
            id: Some(id.into()),
        }
    }

    pub fn system() -> Self {
        Actor {
            role: ActorRole::System,
            id: None,
        }
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// Who called a reservation off, when, why, and what it cost them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cancellation {
    pub cancelled_by: CancelledBy,
    pub actor_id: Option<String>,
    #[ts(as = "String")]
    pub cancelled_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub fee: Money,
}

/// A reservation as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reservation {
    pub id: i64,
    pub uuid: String,
    pub reference_code: String,
    pub provider_id: String,
    pub customer: CustomerRef,
    pub service_id: String,
    pub service_name: String,
    pub slot_id: String,
    pub window: SlotWindow,
    #[ts(as = "Option<String>")]
    pub actual_start: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub actual_end: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub pricing: PricingBreakdown,
    /// Added on top of the breakdown; never folded into it.
    pub tip: Money,
    /// Present exactly when `status` is a cancelled variant.
    pub cancellation: Option<Cancellation>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// `pricing.total + tip`.
    #[inline]
    pub fn effective_total(&self) -> Money {
        self.pricing.total + self.tip
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Everything needed to insert a reservation. Identity, status and
/// timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub provider_id: String,
    pub customer: CustomerRef,
    pub service_id: String,
    pub service_name: String,
    pub slot_id: String,
    pub window: SlotWindow,
    pub pricing: PricingBreakdown,
    pub notes: Option<String>,
}

// =============================================================================
// History
// =============================================================================

/// Kind of mutation an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    StatusChanged,
    Rescheduled,
    Cancelled,
    PaymentStatusChanged,
    Repriced,
    TipRecorded,
}

impl ChangeType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Created => "created",
            ChangeType::StatusChanged => "status_changed",
            ChangeType::Rescheduled => "rescheduled",
            ChangeType::Cancelled => "cancelled",
            ChangeType::PaymentStatusChanged => "payment_status_changed",
            ChangeType::Repriced => "repriced",
            ChangeType::TipRecorded => "tip_recorded",
        }
    }
}

impl FromStr for ChangeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ChangeType::Created),
            "status_changed" => Ok(ChangeType::StatusChanged),
            "rescheduled" => Ok(ChangeType::Rescheduled),
            "cancelled" => Ok(ChangeType::Cancelled),
            "payment_status_changed" => Ok(ChangeType::PaymentStatusChanged),
            "repriced" => Ok(ChangeType::Repriced),
            "tip_recorded" => Ok(ChangeType::TipRecorded),
            other => Err(ValidationError::InvalidFormat {
                field: "change_type".to_string(),
                reason: format!("unknown change type '{other}'"),
            }),
        }
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryEntry {
    pub id: i64,
    pub reservation_id: i64,
    pub change_type: ChangeType,
    /// Mutated fields before the change; `None` for creation.
    #[ts(type = "unknown")]
    pub before: Option<serde_json::Value>,
    /// Mutated fields after the change.
    #[ts(type = "unknown")]
    pub after: serde_json::Value,
    pub actor: Actor,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An audit record about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub reservation_id: i64,
    pub change_type: ChangeType,
    pub before: Option<serde_json::Value>,
    pub after: serde_json::Value,
    pub actor: Actor,
    pub reason: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
