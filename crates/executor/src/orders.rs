use crate::error::ExecutorError;
use api_client::QuoteProvider;
use core_types::{
    normalize_symbol, settle_cash, validate_share_count, Account, Execution, PendingEntry, Quote,
};
use database::LedgerStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Validates and applies buy and sell orders. The only writer to the ledger.
///
/// Holds no mutable state of its own; every call reads the store afresh, so
/// one instance can serve any number of concurrent requests.
#[derive(Clone)]
pub struct OrderExecutor {
    store: Arc<dyn LedgerStore>,
    quotes: Arc<dyn QuoteProvider>,
    default_initial_cash: Decimal,
}

impl OrderExecutor {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        quotes: Arc<dyn QuoteProvider>,
        default_initial_cash: Decimal,
    ) -> Self {
        Self {
            store,
            quotes,
            default_initial_cash,
        }
    }

    /// Opens a new account, funded with `initial_cash` or the configured default.
    pub async fn open_account(&self, initial_cash: Option<Decimal>) -> Result<Account, ExecutorError> {
        let cash = initial_cash.unwrap_or(self.default_initial_cash);
        if cash.is_sign_negative() {
            return Err(ExecutorError::InvalidInput(format!(
                "initial cash must not be negative, got {}",
                cash
            )));
        }
        let account = self.store.open_account(settle_cash(cash)).await?;
        tracing::info!(account_id = %account.account_id, cash = %account.cash, "Account opened.");
        Ok(account)
    }

    /// Looks up the live quote for a symbol.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, ExecutorError> {
        lookup_quote(self.quotes.as_ref(), symbol).await
    }

    /// Buys `shares` of `symbol` at the current price.
    ///
    /// The quote is fetched before the atomic write; the store re-checks the
    /// funds under the account lock, so a concurrent order that spent the cash
    /// first still results in `InsufficientFunds` rather than a negative balance.
    pub async fn buy(&self, account_id: Uuid, symbol: &str, shares: i64) -> Result<Execution, ExecutorError> {
        let result = self.try_buy(account_id, symbol, shares).await;
        log_outcome("buy", account_id, symbol, shares, &result);
        result
    }

    async fn try_buy(&self, account_id: Uuid, symbol: &str, shares: i64) -> Result<Execution, ExecutorError> {
        let shares = validate_share_count(shares)?;
        let quote = self.quote(symbol).await?;

        let pending = PendingEntry::buy(account_id, &quote.symbol, shares, quote.price)?;
        let cost = -pending.cash_delta();

        let account = self.store.account(account_id).await?;
        if cost > account.cash {
            return Err(ExecutorError::InsufficientFunds {
                required: cost,
                available: account.cash,
            });
        }

        Ok(self.store.append(pending).await?)
    }

    /// Sells `shares` of `symbol` at the current price.
    ///
    /// The holding is recomputed from the ledger; there is no running counter
    /// to drift out of step with it.
    pub async fn sell(&self, account_id: Uuid, symbol: &str, shares: i64) -> Result<Execution, ExecutorError> {
        let result = self.try_sell(account_id, symbol, shares).await;
        log_outcome("sell", account_id, symbol, shares, &result);
        result
    }

    async fn try_sell(&self, account_id: Uuid, symbol: &str, shares: i64) -> Result<Execution, ExecutorError> {
        let shares = validate_share_count(shares)?;
        let symbol = normalize_symbol(symbol)?;

        let held = self.store.net_shares(account_id, &symbol).await?;
        if shares > held {
            return Err(ExecutorError::InsufficientShares {
                requested: shares,
                held,
            });
        }

        // A position exists, so "not found" here means the provider lost the
        // symbol, not that the caller asked for a bad one.
        let quote = match self.quotes.lookup(&symbol).await {
            Ok(Some(quote)) => quote,
            Ok(None) => return Err(ExecutorError::delisted(&symbol)),
            Err(e) => return Err(ExecutorError::quote(&symbol, e)),
        };

        let pending = PendingEntry::sell(account_id, &symbol, shares, quote.price)?;
        Ok(self.store.append(pending).await?)
    }
}

/// Normalises `symbol` and fetches its quote.
///
/// A symbol the provider does not know is `InvalidSymbol`; a provider failure
/// is `QuoteUnavailable`.
pub async fn lookup_quote(quotes: &dyn QuoteProvider, symbol: &str) -> Result<Quote, ExecutorError> {
    let symbol = normalize_symbol(symbol)?;
    match quotes.lookup(&symbol).await {
        Ok(Some(quote)) => Ok(quote),
        Ok(None) => Err(ExecutorError::InvalidSymbol(symbol)),
        Err(e) => Err(ExecutorError::quote(&symbol, e)),
    }
}

fn log_outcome(
    side: &'static str,
    account_id: Uuid,
    symbol: &str,
    shares: i64,
    result: &Result<Execution, ExecutorError>,
) {
    match result {
        Ok(execution) => tracing::info!(
            %account_id,
            side,
            symbol = %execution.entry.symbol,
            shares = execution.entry.shares,
            price = %execution.entry.price,
            cash_after = %execution.cash_after,
            "Order committed."
        ),
        Err(ExecutorError::IntegrityViolation(reason)) => tracing::error!(
            %account_id,
            side,
            symbol,
            shares,
            %reason,
            "Order hit an integrity violation."
        ),
        Err(e) => tracing::warn!(
            %account_id,
            side,
            symbol,
            shares,
            reason = e.reason_code(),
            retryable = e.is_retryable(),
            "Order rejected: {}",
            e
        ),
    }
}
