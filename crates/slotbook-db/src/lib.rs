//! # slotbook-db: Database Layer for Slotbook
//!
//! This crate provides reservation persistence on SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Slotbook Data Flow                               │
//! │                                                                         │
//! │  ReservationService::reserve                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   slotbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ReservationStore│   │              │  │   │
//! │  │   │ SqlitePool    │◄───│HistoryRepo     │   │ 001_reserv.. │  │   │
//! │  │   │ BEGIN IMMED.  │    │                │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, write-locked transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Reservation store and history repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! use slotbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/slotbook.db")).await?;
//!
//! let taken = db
//!     .reservations()
//!     .check_conflict("prov-1", &window, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{begin_immediate, Database, DbConfig};

// Repository re-exports for convenience
pub use repository::history::HistoryRepository;
pub use repository::reservation::{
    generate_reference_code, ReservationStore, StatusStamps, DEFAULT_REFERENCE_PREFIX,
};

// Transactions are handed across the crate boundary.
pub use sqlx::{Sqlite, SqliteConnection, Transaction};
