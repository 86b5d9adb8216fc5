//! # Reservation Lifecycle
//!
//! The closed set of reservation statuses and the fixed table of legal moves
//! between them.
//!
//! ## State Diagram
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌─────────┐  confirm  ┌───────────┐  start  ┌────────────┐  finish    │
//! │   │ Pending │──────────►│ Confirmed │────────►│ InProgress │──────────┐ │
//! │   └────┬────┘           └─────┬─────┘         └─────┬──────┘          │ │
//! │        │                      │                     │                 ▼ │
//! │        │ cancel / no-show     │ cancel / no-show    │ cancel  ┌───────────┐
//! │        ▼                      ▼                     ▼         │ Completed │
//! │   ┌──────────────────────────────────┐  ┌────────┐            └───────────┘
//! │   │ Cancelled(Customer | Provider)   │  │ NoShow │                      │
//! │   └──────────────────────────────────┘  └────────┘                      │
//! │                                                                         │
//! │   Completed, Cancelled and NoShow are terminal: no outgoing edges.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Representation
//! | Status                       | String                    |
//! |------------------------------|---------------------------|
//! | `Pending`                    | `pending`                 |
//! | `Confirmed`                  | `confirmed`               |
//! | `InProgress`                 | `in_progress`             |
//! | `Completed`                  | `completed`               |
//! | `Cancelled(Customer)`        | `cancelled_by_customer`   |
//! | `Cancelled(Provider)`        | `cancelled_by_provider`   |
//! | `NoShow`                     | `no_show`                 |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::TransitionError;

// =============================================================================
// Reservation Status
// =============================================================================

/// Who cancelled a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Customer,
    Provider,
}

impl CancelledBy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CancelledBy::Customer => "customer",
            CancelledBy::Provider => "provider",
        }
    }
}

impl FromStr for CancelledBy {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(CancelledBy::Customer),
            "provider" => Ok(CancelledBy::Provider),
            other => Err(TransitionError::InvalidStatus(other.to_string())),
        }
    }
}

/// Lifecycle position of a reservation.
///
/// Serialized as its wire string (see module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ReservationStatus {
    /// Requested, not yet accepted by the provider.
    Pending,
    /// Accepted; the slot is held.
    Confirmed,
    /// Work has started.
    InProgress,
    /// Work finished. Terminal.
    Completed,
    /// Called off by one of the parties. Terminal.
    Cancelled(CancelledBy),
    /// Customer never arrived. Terminal.
    NoShow,
}

/// Number of status kinds (the two cancelled variants share one kind).
const KINDS: usize = 6;

/// Legal edges, indexed `[from][to]` by [`ReservationStatus::kind_index`].
///
/// Read-only data: nothing in the crate writes to it.
const TRANSITIONS: [[bool; KINDS]; KINDS] = [
    //               Pending Confirmed InProgress Completed Cancelled NoShow
    /* Pending    */ [false, true, false, false, true, true],
    /* Confirmed  */ [false, false, true, false, true, true],
    /* InProgress */ [false, false, false, true, true, false],
    /* Completed  */ [false; KINDS],
    /* Cancelled  */ [false; KINDS],
    /* NoShow     */ [false; KINDS],
];

/// One representative per kind, in table order. Cancelled expands to both
/// actors when listing targets.
const ALL: [ReservationStatus; 7] = [
    ReservationStatus::Pending,
    ReservationStatus::Confirmed,
    ReservationStatus::InProgress,
    ReservationStatus::Completed,
    ReservationStatus::Cancelled(CancelledBy::Customer),
    ReservationStatus::Cancelled(CancelledBy::Provider),
    ReservationStatus::NoShow,
];

impl ReservationStatus {
    /// Every status value, including both cancelled variants.
    pub const fn all() -> &'static [ReservationStatus] {
        &ALL
    }

    /// Wire string for this status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::InProgress => "in_progress",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled(CancelledBy::Customer) => "cancelled_by_customer",
            ReservationStatus::Cancelled(CancelledBy::Provider) => "cancelled_by_provider",
            ReservationStatus::NoShow => "no_show",
        }
    }

    const fn kind_index(&self) -> usize {
        match self {
            ReservationStatus::Pending => 0,
            ReservationStatus::Confirmed => 1,
            ReservationStatus::InProgress => 2,
            ReservationStatus::Completed => 3,
            ReservationStatus::Cancelled(_) => 4,
            ReservationStatus::NoShow => 5,
        }
    }

    /// Whether the table permits `self -> to`.
    #[inline]
    pub const fn can_transition_to(&self, to: ReservationStatus) -> bool {
        TRANSITIONS[self.kind_index()][to.kind_index()]
    }

    /// All statuses reachable from `self` in one step.
    pub fn allowed_targets(&self) -> Vec<ReservationStatus> {
        ALL.iter()
            .copied()
            .filter(|to| self.can_transition_to(*to))
            .collect()
    }

    /// A status with no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        TRANSITIONS[self.kind_index()].iter().all(|allowed| !allowed)
    }

    /// Statuses from which an explicit cancellation request is honoured.
    ///
    /// Narrower than the table: `InProgress -> Cancelled` exists for
    /// status changes, but a customer-facing cancel is refused once work starts.
    pub const fn is_cancellable(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Whether a reservation in this status still occupies its slot.
    #[inline]
    pub fn holds_slot(&self) -> bool {
        !self.is_terminal()
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled(_))
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TransitionError::InvalidStatus(s.to_string()))
    }
}

impl From<ReservationStatus> for String {
    fn from(status: ReservationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl TryFrom<String> for ReservationStatus {
    type Error = TransitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// =============================================================================
// Transition Validation
// =============================================================================

/// Checks `from -> to` against the transition table.
///
/// ## Example
/// ```rust
/// use slotbook_core::status::{validate_transition, ReservationStatus};
///
/// assert!(validate_transition(ReservationStatus::Pending, ReservationStatus::Confirmed).is_ok());
/// assert!(validate_transition(ReservationStatus::Completed, ReservationStatus::Pending).is_err());
/// ```
pub fn validate_transition(
    from: ReservationStatus,
    to: ReservationStatus,
) -> Result<(), TransitionError> {
    if from.can_transition_to(to) {
        return Ok(());
    }

    Err(TransitionError::IllegalTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
        allowed: from
            .allowed_targets()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
    })
}

/// Like [`validate_transition`] for wire strings; unknown strings fail with
/// [`TransitionError::InvalidStatus`].
pub fn validate_transition_str(
    from: &str,
    to: &str,
) -> Result<(ReservationStatus, ReservationStatus), TransitionError> {
    let from: ReservationStatus = from.parse()?;
    let to: ReservationStatus = to.parse()?;
    validate_transition(from, to)?;
    Ok((from, to))
}

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement state of a reservation, independent of its lifecycle status.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing collected yet (the default for new reservations).
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Statuses reachable in one step.
    pub const fn allowed_targets(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[PaymentStatus::Paid, PaymentStatus::Failed],
            PaymentStatus::Failed => &[PaymentStatus::Pending, PaymentStatus::Paid],
            PaymentStatus::Paid => &[PaymentStatus::Refunded],
            PaymentStatus::Refunded => &[],
        }
    }

    /// Checks `self -> to`.
    pub fn validate_transition(&self, to: PaymentStatus) -> Result<(), TransitionError> {
        if self.allowed_targets().contains(&to) {
            return Ok(());
        }

        Err(TransitionError::IllegalTransition {
            from: self.as_str().to_string(),
            to: to.as_str().to_string(),
            allowed: self
                .allowed_targets()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        })
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(TransitionError::InvalidStatus(other.to_string())),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
