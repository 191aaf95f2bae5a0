use crate::error::DbError;
use async_trait::async_trait;
use core_types::{Account, AccountStatement, Execution, PendingEntry};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Persistence contract for cash balances and the append-only holdings ledger.
///
/// Implementations own atomicity: [`LedgerStore::append`] inserts the entry and
/// applies its cash adjustment as one unit, serialized against every other
/// write to the same account and independent of writes to other accounts.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Creates an account holding `initial_cash`.
    async fn open_account(&self, initial_cash: Decimal) -> Result<Account, DbError>;

    /// Reads the current account row.
    async fn account(&self, account_id: Uuid) -> Result<Account, DbError>;

    /// Sum of signed shares for one symbol. Zero when nothing was ever traded.
    async fn net_shares(&self, account_id: Uuid, symbol: &str) -> Result<i64, DbError>;

    /// The account and its full ledger, read at a single point in time.
    async fn statement(&self, account_id: Uuid) -> Result<AccountStatement, DbError>;

    /// The atomic write unit.
    ///
    /// Under the account lock, re-checks that the resulting cash is not
    /// negative and that the resulting net position in the entry's symbol is
    /// not negative, then appends the entry and adjusts the balance. Either
    /// both changes commit or neither does.
    async fn append(&self, entry: PendingEntry) -> Result<Execution, DbError>;
}

/// Applies the write guards shared by every store implementation.
pub(crate) fn check_guards(entry: &PendingEntry, cash: Decimal, held: i64) -> Result<(), DbError> {
    let delta = entry.cash_delta();
    if cash + delta < Decimal::ZERO {
        return Err(DbError::InsufficientFunds {
            required: -delta,
            available: cash,
        });
    }
    if entry.shares() < 0 && held + entry.shares() < 0 {
        return Err(DbError::InsufficientShares {
            requested: -entry.shares(),
            held,
        });
    }
    Ok(())
}
