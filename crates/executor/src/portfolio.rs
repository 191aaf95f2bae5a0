use crate::error::ExecutorError;
use api_client::QuoteProvider;
use configuration::QuoteFailurePolicy;
use core_types::{round_cash, AccountStatement, LedgerEntry};
use database::LedgerStore;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// An open position valued at the current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionValuation {
    pub symbol: String,
    pub name: String,
    pub net_shares: i64,
    pub current_price: Decimal,
    pub market_value: Decimal,
}

/// An open position that could not be priced under [`QuoteFailurePolicy::Omit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnpricedPosition {
    pub symbol: String,
    pub net_shares: i64,
    pub reason: String,
}

/// An open position without pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub net_shares: i64,
}

/// A point-in-time, read-only view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioSnapshot {
    pub account_id: Uuid,
    pub cash: Decimal,
    /// Ordered by symbol.
    pub positions: Vec<PositionValuation>,
    /// Always empty under [`QuoteFailurePolicy::Fail`].
    pub unpriced: Vec<UnpricedPosition>,
    /// `cash` plus the market value of every priced position.
    pub total: Decimal,
}

/// Sums signed shares per symbol. `None` if a sum leaves the `i64` range.
pub fn net_positions(entries: &[LedgerEntry]) -> Option<BTreeMap<String, i64>> {
    entries.iter().try_fold(BTreeMap::new(), |mut acc, entry| {
        let held = acc.entry(entry.symbol.clone()).or_insert(0i64);
        *held = held.checked_add(entry.shares)?;
        Some(acc)
    })
}

/// Net positions with a strictly positive holding.
///
/// A negative sum means the ledger already broke the no-oversell rule; it is
/// reported and left out rather than shown as a short position.
fn open_positions(account_id: Uuid, entries: &[LedgerEntry]) -> Result<BTreeMap<String, i64>, ExecutorError> {
    let mut positions = net_positions(entries)
        .ok_or_else(|| ExecutorError::Overflow(format!("net positions of account {}", account_id)))?;
    positions.retain(|symbol, net_shares| {
        if *net_shares < 0 {
            tracing::error!(%account_id, %symbol, net_shares = *net_shares, "Negative net position in ledger.");
        }
        *net_shares > 0
    });
    Ok(positions)
}

/// Folds the ledger into current holdings and values them. Read-only.
#[derive(Clone)]
pub struct PortfolioAggregator {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteProvider>,
    policy: QuoteFailurePolicy,
}

impl PortfolioAggregator {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        quotes: Arc<dyn QuoteProvider>,
        policy: QuoteFailurePolicy,
    ) -> Self {
        Self { store, quotes, policy }
    }

    /// Values every open position at the current price.
    pub async fn get_portfolio(&self, account_id: Uuid) -> Result<PortfolioSnapshot, ExecutorError> {
        let AccountStatement { account, entries } = self.store.statement(account_id).await?;
        let open = open_positions(account_id, &entries)?;

        let lookups = join_all(open.keys().map(|symbol| self.quotes.lookup(symbol))).await;

        let mut positions = Vec::with_capacity(open.len());
        let mut unpriced = Vec::new();
        for ((symbol, net_shares), lookup) in open.into_iter().zip(lookups) {
            let priced = match lookup {
                Ok(Some(quote)) => Ok(quote),
                Ok(None) => Err(ExecutorError::delisted(&symbol)),
                Err(e) => Err(ExecutorError::quote(&symbol, e)),
            };

            match priced {
                Ok(quote) => {
                    let market_value = Decimal::from(net_shares)
                        .checked_mul(quote.price)
                        .map(round_cash)
                        .ok_or_else(|| ExecutorError::Overflow(format!("{} market value", symbol)))?;
                    positions.push(PositionValuation {
                        symbol,
                        name: quote.name,
                        net_shares,
                        current_price: quote.price,
                        market_value,
                    });
                }
                Err(e) if self.policy == QuoteFailurePolicy::Fail => {
                    tracing::warn!(%account_id, %symbol, "Portfolio valuation failed: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(%account_id, %symbol, "Omitting unpriced position: {}", e);
                    unpriced.push(UnpricedPosition {
                        symbol,
                        net_shares,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let total = positions
            .iter()
            .try_fold(account.cash, |acc, p| acc.checked_add(p.market_value))
            .ok_or_else(|| ExecutorError::Overflow("portfolio total".to_string()))?;

        Ok(PortfolioSnapshot {
            account_id,
            cash: account.cash,
            positions,
            unpriced,
            total,
        })
    }

    /// The raw ledger, oldest first.
    pub async fn get_history(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, ExecutorError> {
        Ok(self.store.statement(account_id).await?.entries)
    }

    /// Open positions without pricing, ordered by symbol.
    pub async fn holdings(&self, account_id: Uuid) -> Result<Vec<Holding>, ExecutorError> {
        let statement = self.store.statement(account_id).await?;
        Ok(open_positions(account_id, &statement.entries)?
            .into_iter()
            .map(|(symbol, net_shares)| Holding { symbol, net_shares })
            .collect())
    }
}
