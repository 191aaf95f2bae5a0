//! # Equitybook Executor Crate
//!
//! This crate provides the two services that sit on top of the ledger: the
//! `OrderExecutor`, which validates and applies buy and sell orders, and the
//! `PortfolioAggregator`, which folds the ledger into holdings and values them
//! at current prices.
//!
//! ## Architectural Principles
//!
//! - **The Ledger Is the Truth:** Holdings are never stored. They are derived on
//!   every read by summing signed ledger entries, so there is no second copy of
//!   the position to drift out of step with the history.
//! - **One Atomic Write:** An order is either fully applied (ledger entry plus
//!   cash adjustment) or not at all. Both services depend only on the
//!   `LedgerStore` and `QuoteProvider` traits, so they run unchanged against
//!   PostgreSQL and the live quote feed or against the in-memory doubles.
//!
//! ## Public API
//!
//! - `OrderExecutor`: The only writer to the ledger.
//! - `lookup_quote`: Symbol normalisation plus quote lookup, shared with the CLI.
//! - `PortfolioAggregator`: Read-only portfolio, history, and holdings views.
//! - `PortfolioSnapshot`, `PositionValuation`, `UnpricedPosition`, `Holding`: The read models.
//! - `ExecutorError`: The error type callers branch on.

pub mod error;
pub mod orders;
pub mod portfolio;

pub use error::ExecutorError;
pub use orders::{lookup_quote, OrderExecutor};
pub use portfolio::{
    net_positions, Holding, PortfolioAggregator, PortfolioSnapshot, PositionValuation,
    UnpricedPosition,
};
