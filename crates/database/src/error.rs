use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("The ledger store is unavailable: {0}")]
    Unavailable(String),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Account {0} was not found in the database.")]
    AccountNotFound(Uuid),

    #[error("Not enough cash to commit entry. Required: {required}, Available: {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Not enough shares to commit entry. Requested: {requested}, Held: {held}")]
    InsufficientShares { requested: i64, held: i64 },

    #[error("A ledger integrity rule was violated: {0}")]
    IntegrityViolation(String),
}

impl From<sqlx::Error> for DbError {
    /// Constraint violations (SQLSTATE class 23) mean an invariant was about to
    /// break; everything else is the store failing to complete the request.
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.code().is_some_and(|code| code.starts_with("23")) =>
            {
                DbError::IntegrityViolation(db_err.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
                DbError::IntegrityViolation(err.to_string())
            }
            _ => DbError::Unavailable(err.to_string()),
        }
    }
}
