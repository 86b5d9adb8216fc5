//! # slotbook-service: Reservation Orchestration
//!
//! Owns the locking protocol, the audit trail and the caller-facing error
//! taxonomy. Transport layers (HTTP, gRPC, CLI) wrap [`ReservationService`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   caller ──► ReservationService ──┬──► ProviderDirectory  (Arc<dyn>)    │
//! │                 │                 ├──► ServiceCatalog     (Arc<dyn>)    │
//! │                 │                 └──► CustomerDirectory  (Arc<dyn>)    │
//! │                 │                                                       │
//! │                 ├──► slotbook-core   pricing, transitions, validation   │
//! │                 │                                                       │
//! │                 └──► slotbook-db     BEGIN IMMEDIATE, store, history    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use slotbook_service::{ReservationService, ServiceConfig};
//!
//! let service = ReservationService::new(db, ServiceConfig::load()?, providers, catalog, customers);
//! let reservation = service.reserve(request).await?;
//! service
//!     .change_status(reservation.id, ReservationStatus::Confirmed, Actor::provider("prov-1"))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod directory;
pub mod error;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, ServiceConfig};
pub use directory::{
    CustomerDirectory, CustomerInfo, InMemoryDirectory, LookupError, ProviderDirectory,
    ProviderInfo, ServiceCatalog, ServiceDefinition,
};
pub use error::{ReservationError, ReservationResult};
pub use service::{PricingInputs, ReservationService, ReserveRequest, ServiceInfo};
