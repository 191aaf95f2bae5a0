//! # Equitybook Database Crate
//!
//! This crate owns the durable state of the system: one cash balance per
//! account and the append-only ledger of purchases and sales.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** All database-specific logic lives here, behind the
//!   `LedgerStore` trait. The executor never sees SQL.
//! - **Atomic Write Unit:** `LedgerStore::append` inserts an entry and applies
//!   its cash adjustment in one transaction, holding a row lock on the account
//!   so concurrent orders for the same account cannot both pass validation.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and the
//!   PostgreSQL store uses a connection pool (`PgPool`).
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: pool setup and schema migration.
//! - `LedgerStore`: the persistence contract.
//! - `PgLedgerStore`: the PostgreSQL implementation.
//! - `MemoryLedgerStore`: an in-process implementation for paper trading and tests.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use store::LedgerStore;
