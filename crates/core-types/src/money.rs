use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fraction digits carried by every cash amount.
pub const CASH_SCALE: u32 = 2;

/// Rounds an amount to cents, midpoint away from zero.
///
/// Used for valuations, which move no money.
pub fn round_cash(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CASH_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a signed change to an account's cash down to the cent.
///
/// A debit grows to the next cent and a credit shrinks to the previous one, so
/// the account never receives more than the exact amount or pays less than it.
/// Repeated trades at sub-cent prices cannot create cash.
pub fn settle_cash(change: Decimal) -> Decimal {
    change.round_dp_with_strategy(CASH_SCALE, RoundingStrategy::ToNegativeInfinity)
}

/// Renders a cash amount as US dollars: `$1,234.56`, `-$12.50`.
pub fn format_usd(amount: Decimal) -> String {
    let mut rounded = round_cash(amount);
    rounded.rescale(CASH_SCALE);
    format_dollars(rounded)
}

/// Renders a per-share price at full precision, with at least two fraction
/// digits: `$33.333`, `$50.00`.
pub fn format_price(price: Decimal) -> String {
    let mut price = price.normalize();
    if price.scale() < CASH_SCALE {
        price.rescale(CASH_SCALE);
    }
    format_dollars(price)
}

fn format_dollars(amount: Decimal) -> String {
    let negative = amount.is_sign_negative() && !amount.is_zero();
    let text = amount.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, fraction)
}
