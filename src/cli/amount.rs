//! Amount parsing for operator input.
//!
//! Accepted forms:
//! - `1500` or `1500wei`: wei
//! - `30gwei`: gwei, whole or decimal
//! - `0.25eth` / `0.25ether`: ether, up to 18 decimals

use arisan::identity::{Wei, WEI_PER_ETHER};

const WEI_PER_GWEI: Wei = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount '{0}'")]
    Invalid(String),

    #[error("amount '{0}' has more decimals than the unit allows")]
    TooPrecise(String),

    #[error("amount '{0}' is too large")]
    Overflow(String),
}

/// Parse an amount into wei.
pub fn parse_amount(input: &str) -> Result<Wei, AmountError> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let (number, unit, decimals) = if let Some(n) = s.strip_suffix("ether") {
        (n, WEI_PER_ETHER, 18)
    } else if let Some(n) = s.strip_suffix("gwei") {
        (n, WEI_PER_GWEI, 9)
    } else if let Some(n) = s.strip_suffix("eth") {
        (n, WEI_PER_ETHER, 18)
    } else if let Some(n) = s.strip_suffix("wei") {
        (n, 1, 0)
    } else {
        (s.as_str(), 1, 0)
    };

    let number = number.trim().replace('_', "");
    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number.as_str(), ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(input.to_string()));
    }
    if fraction.len() > decimals {
        return Err(AmountError::TooPrecise(input.to_string()));
    }

    let digits = |part: &str| -> Result<Wei, AmountError> {
        if part.is_empty() {
            return Ok(0);
        }
        if !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::Invalid(input.to_string()));
        }
        part.parse::<Wei>()
            .map_err(|_| AmountError::Overflow(input.to_string()))
    };

    let whole_wei = digits(whole)?
        .checked_mul(unit)
        .ok_or_else(|| AmountError::Overflow(input.to_string()))?;
    let fraction_wei = digits(fraction)? * 10u128.pow((decimals - fraction.len()) as u32);

    whole_wei
        .checked_add(fraction_wei)
        .ok_or_else(|| AmountError::Overflow(input.to_string()))
}

/// Render wei as ether with trailing zeros trimmed.
pub fn format_ether(amount: Wei) -> String {
    let whole = amount / WEI_PER_ETHER;
    let fraction = amount % WEI_PER_ETHER;
    if fraction == 0 {
        return format!("{} ETH", whole);
    }
    let fraction = format!("{:018}", fraction);
    format!("{}.{} ETH", whole, fraction.trim_end_matches('0'))
}
