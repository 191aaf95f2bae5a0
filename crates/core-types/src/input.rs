//! Normalisation of caller-supplied order fields.

use crate::error::CoreError;

/// Parses a textual share count. Only positive whole numbers are accepted;
/// `"1.5"`, `"abc"`, `"0"` and `"-3"` are all rejected.
pub fn parse_share_count(raw: &str) -> Result<i64, CoreError> {
    let shares = raw.trim().parse::<i64>().map_err(|_| {
        CoreError::InvalidInput("shares".to_string(), format!("'{}' is not a whole number", raw.trim()))
    })?;
    validate_share_count(shares)
}

/// Rejects zero and negative share counts.
pub fn validate_share_count(shares: i64) -> Result<i64, CoreError> {
    if shares <= 0 {
        return Err(CoreError::InvalidInput(
            "shares".to_string(),
            format!("must be a positive integer, got {}", shares),
        ));
    }
    Ok(shares)
}

/// Trims and upper-cases a ticker symbol.
pub fn normalize_symbol(raw: &str) -> Result<String, CoreError> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(CoreError::InvalidInput("symbol".to_string(), "must not be empty".to_string()));
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return Err(CoreError::InvalidInput(
            "symbol".to_string(),
            format!("'{}' contains unsupported characters", symbol),
        ));
    }
    Ok(symbol)
}
