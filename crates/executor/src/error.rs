use api_client::error::QuoteError;
use core_types::CoreError;
use database::DbError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Every way a caller-facing operation can be rejected.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown symbol: {0}")]
    InvalidSymbol(String),

    #[error("Quote unavailable for {symbol}: {reason}")]
    QuoteUnavailable { symbol: String, reason: String },

    #[error("Not enough cash available to execute trade. Required: {required}, Available: {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Not enough shares to sell. Requested: {requested}, Held: {held}")]
    InsufficientShares { requested: i64, held: i64 },

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("The ledger store could not complete the request: {0}")]
    StoreUnavailable(String),

    #[error("Ledger integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Value is too large to represent: {0}")]
    Overflow(String),
}

impl ExecutorError {
    /// Whether the same request may succeed if simply repeated. Retryable
    /// failures never leave partial state behind.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutorError::QuoteUnavailable { .. } | ExecutorError::StoreUnavailable(_)
        )
    }

    /// A stable, machine-readable code for the rejection.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ExecutorError::InvalidInput(_) => "invalid_input",
            ExecutorError::InvalidSymbol(_) => "invalid_symbol",
            ExecutorError::QuoteUnavailable { .. } => "quote_unavailable",
            ExecutorError::InsufficientFunds { .. } => "insufficient_funds",
            ExecutorError::InsufficientShares { .. } => "insufficient_shares",
            ExecutorError::AccountNotFound(_) => "account_not_found",
            ExecutorError::StoreUnavailable(_) => "store_unavailable",
            ExecutorError::IntegrityViolation(_) => "integrity_violation",
            ExecutorError::Overflow(_) => "overflow",
        }
    }

    /// A held symbol that the provider no longer recognises cannot be priced.
    pub(crate) fn delisted(symbol: &str) -> Self {
        ExecutorError::QuoteUnavailable {
            symbol: symbol.to_string(),
            reason: "provider no longer recognises a held symbol".to_string(),
        }
    }

    pub(crate) fn quote(symbol: &str, err: QuoteError) -> Self {
        ExecutorError::QuoteUnavailable {
            symbol: symbol.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<CoreError> for ExecutorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(field, reason) => {
                ExecutorError::InvalidInput(format!("{}: {}", field, reason))
            }
            CoreError::Calculation(reason) => ExecutorError::InvalidInput(reason),
        }
    }
}

impl From<DbError> for ExecutorError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AccountNotFound(id) => ExecutorError::AccountNotFound(id),
            DbError::InsufficientFunds { required, available } => {
                ExecutorError::InsufficientFunds { required, available }
            }
            DbError::InsufficientShares { requested, held } => {
                ExecutorError::InsufficientShares { requested, held }
            }
            DbError::IntegrityViolation(reason) => {
                tracing::error!(%reason, "Ledger integrity violation reported by the store.");
                ExecutorError::IntegrityViolation(reason)
            }
            other @ (DbError::Unavailable(_)
            | DbError::ConnectionConfigError(_)
            | DbError::MigrationError(_)) => ExecutorError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_transient_failures_are_retryable() {
        assert!(ExecutorError::StoreUnavailable("down".into()).is_retryable());
        assert!(ExecutorError::quote("X", QuoteError::Unavailable("timeout".into())).is_retryable());

        let permanent = [
            ExecutorError::InvalidInput("shares".into()),
            ExecutorError::InvalidSymbol("X".into()),
            ExecutorError::InsufficientFunds { required: dec!(1), available: dec!(0) },
            ExecutorError::InsufficientShares { requested: 1, held: 0 },
            ExecutorError::IntegrityViolation("cash".into()),
            ExecutorError::Overflow("X market value".into()),
        ];
        for err in permanent {
            assert!(!err.is_retryable(), "{} should not be retryable", err.reason_code());
        }
    }

    #[test]
    fn test_store_errors_keep_their_meaning() {
        let err: ExecutorError = DbError::InsufficientShares { requested: 5, held: 2 }.into();
        assert!(matches!(err, ExecutorError::InsufficientShares { requested: 5, held: 2 }));

        let err: ExecutorError = DbError::Unavailable("pool timed out".into()).into();
        assert_eq!(err.reason_code(), "store_unavailable");

        let err: ExecutorError = DbError::IntegrityViolation("check".into()).into();
        assert_eq!(err.reason_code(), "integrity_violation");
    }
}
