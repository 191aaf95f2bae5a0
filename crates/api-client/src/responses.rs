use rust_decimal::Decimal;
use serde::Deserialize;

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.

/// The subset of `GET /stock/{symbol}/quote` that we consume.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IexQuoteResponse {
    pub symbol: String,
    pub company_name: String,
    /// Null outside trading data availability windows.
    pub latest_price: Option<Decimal>,
}
