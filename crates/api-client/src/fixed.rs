use crate::error::QuoteError;
use crate::QuoteProvider;
use async_trait::async_trait;
use core_types::Quote;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Table {
    prices: HashMap<String, Decimal>,
    failing: HashSet<String>,
}

/// A [`QuoteProvider`] that answers from an in-process price table.
///
/// Prices can be changed between calls, and individual symbols can be made
/// to fail with [`QuoteError::Unavailable`] to exercise retry paths.
#[derive(Debug, Default)]
pub struct FixedQuoteProvider {
    table: RwLock<Table>,
}

impl FixedQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for seeding prices.
    pub fn with_price(self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        let mut table = self.table.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        table.prices.insert(symbol.to_ascii_uppercase(), price);
    }

    /// Forgets `symbol`, so later lookups answer "not found".
    pub fn remove_price(&self, symbol: &str) {
        let mut table = self.table.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        table.prices.remove(&symbol.to_ascii_uppercase());
    }

    /// Makes lookups for `symbol` fail (or succeed again).
    pub fn set_failing(&self, symbol: &str, failing: bool) {
        let mut table = self.table.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let symbol = symbol.to_ascii_uppercase();
        if failing {
            table.failing.insert(symbol);
        } else {
            table.failing.remove(&symbol);
        }
    }
}

#[async_trait]
impl QuoteProvider for FixedQuoteProvider {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        let table = self.table.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let symbol = symbol.to_ascii_uppercase();
        if table.failing.contains(&symbol) {
            return Err(QuoteError::Unavailable(format!("lookup for {} is failing", symbol)));
        }
        Ok(table.prices.get(&symbol).map(|price| Quote {
            name: format!("{} (fixed)", symbol),
            symbol,
            price: *price,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_lookup_known_unknown_and_failing() {
        let provider = FixedQuoteProvider::new().with_price("x", dec!(50.00));

        let quote = provider.lookup("X").await.unwrap().unwrap();
        assert_eq!(quote.symbol, "X");
        assert_eq!(quote.price, dec!(50.00));

        assert!(provider.lookup("NOPE").await.unwrap().is_none());

        provider.set_failing("X", true);
        assert!(matches!(provider.lookup("X").await, Err(QuoteError::Unavailable(_))));
        provider.set_failing("X", false);

        provider.set_price("X", dec!(60.00));
        assert_eq!(provider.lookup("X").await.unwrap().unwrap().price, dec!(60.00));
    }
}
