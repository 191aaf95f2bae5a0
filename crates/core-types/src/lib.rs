pub mod enums;
pub mod error;
pub mod input;
pub mod money;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::OrderSide;
pub use error::CoreError;
pub use input::{normalize_symbol, parse_share_count, validate_share_count};
pub use money::{format_price, format_usd, round_cash, settle_cash};
pub use structs::{Account, AccountStatement, Execution, LedgerEntry, PendingEntry, Quote};
