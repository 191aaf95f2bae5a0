use serde::{Deserialize, Serialize};

/// Direction of a ledger entry. Not stored: it is implied by the sign of `shares`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Derives the side from a signed share quantity. Positive is a buy.
    pub fn from_shares(shares: i64) -> Self {
        if shares > 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}
