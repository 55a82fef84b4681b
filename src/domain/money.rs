use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Money is an exact decimal so sums over many entries never drift by a cent.
pub type Amount = Decimal;

/// Minimum number of fraction digits kept on stored amounts.
pub const AMOUNT_SCALE: u32 = 2;

/// Format an amount with exactly two decimal places.
/// Example: 1000 -> "1000.00", 12.5 -> "12.50", -987.5 -> "-987.50"
pub fn format_amount(amount: Amount) -> String {
    format!("{:.2}", amount.round_dp(AMOUNT_SCALE))
}

/// Raise the scale of an amount to at least two fraction digits without
/// discarding any precision it already carries.
pub fn normalize_scale(mut amount: Amount) -> Amount {
    if amount.scale() < AMOUNT_SCALE {
        amount.rescale(AMOUNT_SCALE);
    }
    amount
}

/// Parse a decimal string into an amount.
/// Example: "50.00" -> 50.00, "12.5" -> 12.50, " 100 " -> 100.00
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    Decimal::from_str(input)
        .map(normalize_scale)
        .map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat(String),
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "empty amount"),
            ParseAmountError::InvalidFormat(raw) => write!(f, "invalid money format: '{}'", raw),
        }
    }
}

impl std::error::Error for ParseAmountError {}
