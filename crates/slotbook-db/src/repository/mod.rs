//! # Repository Module
//!
//! Database repository implementations for Slotbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  ReservationService                                                    │
//! │       │                                                                 │
//! │       │  tx = begin_immediate(pool)                                    │
//! │       ▼                                                                 │
//! │  ReservationStore                      HistoryRepository               │
//! │  ├── check_conflict(_for_update)       ├── append(conn, entry)         │
//! │  ├── create(_in_transaction)           └── for_reservation(id)         │
//! │  ├── find_by_id / uuid / reference                                     │
//! │  └── update_status / cancel / ...                                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Methods that take `&mut SqliteConnection` run on the caller's transaction;
//! the rest use the pool directly.

pub mod history;
pub mod reservation;
