//! # slotbook-core: Pure Business Logic for Slotbook
//!
//! This crate is the **heart** of Slotbook. It holds the reservation rules as
//! pure functions and plain data with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Slotbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        API layer (HTTP / gRPC / CLI - not in this workspace)    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          slotbook-service (transactions, audit, lookups)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ slotbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │  status   │  │ validation│  │   │
//! │  │   │Reservation│  │ Breakdown │  │  table    │  │   rules   │  │   │
//! │  │   │SlotWindow │  │   Money   │  │ Payment   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          slotbook-db (SQLite, overlap predicate, locking)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Reservation, SlotWindow, HistoryEntry, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - PricingCalculator and cancellation fees
//! - [`status`] - Reservation lifecycle and payment status tables
//! - [`error`] - Domain error types
//! - [`validation`] - Input shape validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: cents in an i64, one half-up rounding per rate
//! 4. **Data, not dispatch**: the lifecycle is a constant table
//!
//! ## Example Usage
//!
//! ```rust
//! use slotbook_core::status::{validate_transition, ReservationStatus};
//!
//! assert!(validate_transition(ReservationStatus::Confirmed, ReservationStatus::InProgress).is_ok());
//! assert!(ReservationStatus::NoShow.is_terminal());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, PricingError, TransitionError, ValidationError};
pub use money::Money;
pub use pricing::{CancellationPolicy, PricingBreakdown, PricingInput};
pub use status::{CancelledBy, PaymentStatus, ReservationStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency used when neither the request nor configuration names one.
pub const DEFAULT_CURRENCY: &str = "USD";
