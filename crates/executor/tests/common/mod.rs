#![allow(dead_code)]

use api_client::FixedQuoteProvider;
use configuration::QuoteFailurePolicy;
use database::MemoryLedgerStore;
use executor::{OrderExecutor, PortfolioAggregator};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const DEFAULT_CASH: Decimal = dec!(10000.00);

/// Both services wired to the same in-memory store and price table.
pub struct Harness {
    pub store: Arc<MemoryLedgerStore>,
    pub quotes: Arc<FixedQuoteProvider>,
    pub orders: OrderExecutor,
    pub portfolio: PortfolioAggregator,
}

impl Harness {
    pub fn new(policy: QuoteFailurePolicy) -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let quotes = Arc::new(
            FixedQuoteProvider::new()
                .with_price("X", dec!(50.00))
                .with_price("Y", dec!(20.00))
                .with_price("Z", dec!(33.333)),
        );
        let orders = OrderExecutor::new(store.clone(), quotes.clone(), DEFAULT_CASH);
        let portfolio = PortfolioAggregator::new(store.clone(), quotes.clone(), policy);
        Self {
            store,
            quotes,
            orders,
            portfolio,
        }
    }
}

pub fn harness() -> Harness {
    Harness::new(QuoteFailurePolicy::Fail)
}
