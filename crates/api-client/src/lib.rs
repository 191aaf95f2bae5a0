use crate::error::QuoteError;
use crate::responses::IexQuoteResponse;
use async_trait::async_trait;
use configuration::{QuoteConfig, QuoteSource};
use core_types::Quote;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

pub mod error;
pub mod fixed;
pub mod responses;
// --- Public API ---
pub use fixed::FixedQuoteProvider;

/// The abstract interface for a live price source.
///
/// Lookups are pure queries. An unknown symbol is `Ok(None)`, not an error;
/// `Err` always means the provider could not give an answer right now and the
/// call is safe to retry.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, QuoteError>;
}

/// A [`QuoteProvider`] backed by the IEX Cloud REST API.
#[derive(Clone)]
pub struct IexCloudClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl IexCloudClient {
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| QuoteError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }
}

/// Maps an IEX response onto the lookup contract.
fn interpret_response(status: StatusCode, body: &str) -> Result<Option<Quote>, QuoteError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(QuoteError::Unavailable(format!("HTTP {}: {}", status, body.trim())));
    }

    let raw: IexQuoteResponse =
        serde_json::from_str(body).map_err(|e| QuoteError::Deserialization(e.to_string()))?;

    let price = raw
        .latest_price
        .ok_or_else(|| QuoteError::Unavailable(format!("no price available for {}", raw.symbol)))?;
    if price <= Decimal::ZERO {
        return Err(QuoteError::InvalidData(format!(
            "non-positive price {} for {}",
            price, raw.symbol
        )));
    }

    Ok(Some(Quote {
        symbol: raw.symbol,
        name: raw.company_name,
        price,
    }))
}

#[async_trait]
impl QuoteProvider for IexCloudClient {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>, QuoteError> {
        let url = format!("{}/stock/{}/quote", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.api_token.as_str())])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        tracing::debug!(symbol, %status, "IEX quote response received.");
        interpret_response(status, &text)
    }
}

/// Builds the provider selected by `quotes.source`.
pub fn provider_from_config(config: &QuoteConfig) -> Result<Arc<dyn QuoteProvider>, QuoteError> {
    match config.source {
        QuoteSource::Iex => {
            let token = config.api_token.as_deref().unwrap_or_default();
            let client = IexCloudClient::new(
                &config.base_url,
                token,
                Duration::from_millis(config.timeout_ms),
            )?;
            Ok(Arc::new(client))
        }
        QuoteSource::Fixed => {
            let provider = FixedQuoteProvider::new();
            for (symbol, price) in &config.fixed_prices {
                provider.set_price(symbol, *price);
            }
            Ok(Arc::new(provider))
        }
    }
}
