use crate::enums::OrderSide;
use crate::error::CoreError;
use crate::input::validate_share_count;
use crate::money::settle_cash;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A cash account. `cash` is never negative and carries two fraction digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub cash: Decimal,
    pub created_at: DateTime<Utc>,
}

/// An immutable, committed row of the holdings ledger.
///
/// `shares > 0` is a purchase and `shares < 0` a sale, so the current holding
/// of a symbol is the plain sum of `shares` over its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    /// Store-assigned sequence; breaks ties between equal timestamps.
    pub entry_id: i64,
    pub account_id: Uuid,
    pub symbol: String,
    pub shares: i64,
    /// Price per share captured at execution time.
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn side(&self) -> OrderSide {
        OrderSide::from_shares(self.shares)
    }

    /// Signed change the entry made to the account's cash. The product was
    /// checked for overflow when the entry was still pending.
    pub fn cash_delta(&self) -> Decimal {
        settle_cash(-(Decimal::from(self.shares) * self.price))
    }

    /// Cash paid (buy) or received (sell), always positive.
    pub fn notional(&self) -> Decimal {
        self.cash_delta().abs()
    }
}

/// A ledger entry that has been validated but not yet committed.
///
/// The cash adjustment is derived from `shares * price` at construction and
/// cannot be set independently, so an entry and its balance change never
/// disagree. It is settled to the cent against the account: a buy pays at
/// least the exact cost and a sale receives at most the exact proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    account_id: Uuid,
    symbol: String,
    shares: i64,
    price: Decimal,
    cash_delta: Decimal,
}

impl PendingEntry {
    /// A purchase of `shares` at `price`; debits the account.
    pub fn buy(account_id: Uuid, symbol: &str, shares: i64, price: Decimal) -> Result<Self, CoreError> {
        let shares = validate_share_count(shares)?;
        Self::new(account_id, symbol, shares, price)
    }

    /// A sale of `shares` at `price`; credits the account.
    pub fn sell(account_id: Uuid, symbol: &str, shares: i64, price: Decimal) -> Result<Self, CoreError> {
        let shares = validate_share_count(shares)?;
        Self::new(account_id, symbol, -shares, price)
    }

    fn new(account_id: Uuid, symbol: &str, shares: i64, price: Decimal) -> Result<Self, CoreError> {
        if price <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "price".to_string(),
                format!("must be positive, got {}", price),
            ));
        }
        let notional = Decimal::from(shares)
            .checked_mul(price)
            .ok_or_else(|| CoreError::Calculation(format!("{} x {} overflows", shares, price)))?;

        Ok(Self {
            account_id,
            symbol: symbol.to_string(),
            shares,
            price,
            cash_delta: settle_cash(-notional),
        })
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn shares(&self) -> i64 {
        self.shares
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Signed change to the account's cash: negative for a buy, positive for a sale.
    pub fn cash_delta(&self) -> Decimal {
        self.cash_delta
    }

    pub fn side(&self) -> OrderSide {
        OrderSide::from_shares(self.shares)
    }

    /// Turns the pending entry into its committed form. The store supplies the
    /// id and the commit timestamp.
    pub fn into_entry(self, entry_id: i64, executed_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            entry_id,
            account_id: self.account_id,
            symbol: self.symbol,
            shares: self.shares,
            price: self.price,
            executed_at,
        }
    }
}

/// The receipt of a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub entry: LedgerEntry,
    /// The account's cash balance immediately after the commit.
    pub cash_after: Decimal,
}

/// An account together with its full ledger, read at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub account: Account,
    /// Ordered by `executed_at`, then `entry_id`.
    pub entries: Vec<LedgerEntry>,
}

/// A live price answer from a quote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}
