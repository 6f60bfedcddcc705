//! Conversions between on-chain integer token units and [`Decimal`].

use std::str::FromStr;

use alloy::primitives::U256;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::ValidationError;

/// Decimals of price-feed answers and market target prices.
pub const PRICE_DECIMALS: u32 = 8;

const MAX_SCALE: u32 = 28;

/// Accepts the partial numeric input a user can type: digits with at most one dot.
static AMOUNT_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d*\.?\d*$").expect("valid regex"));

/// Convert an integer amount of base units into a token-denominated decimal.
///
/// Returns `None` when the whole-token part does not fit into a [`Decimal`].
/// Fraction digits beyond the 28 a [`Decimal`] can hold are dropped.
pub fn to_decimal(value: U256, decimals: u32) -> Option<Decimal> {
    let unit = U256::from(10u8).checked_pow(U256::from(decimals))?;
    let (whole, fraction) = value.div_rem(unit);

    let whole = Decimal::from_str(&whole.to_string()).ok()?;
    let scale = decimals.min(MAX_SCALE);
    let fraction = fraction / U256::from(10u8).pow(U256::from(decimals - scale));
    let fraction = Decimal::try_from_i128_with_scale(i128::try_from(fraction).ok()?, scale).ok()?;

    whole.checked_add(fraction).map(|d| d.normalize())
}

/// Convert base units to a decimal, treating unrepresentable values as zero.
pub fn to_decimal_lossy(value: U256, decimals: u32) -> Decimal {
    to_decimal(value, decimals).unwrap_or_else(|| {
        warn!(value = %value, decimals, "Amount too large for a decimal, using zero");
        Decimal::ZERO
    })
}

/// Parse a decimal string as the raw base-unit figure it already is (e.g. "700000000").
///
/// Anything that is not a non-negative number yields zero.
pub fn parse_non_negative(raw: &str) -> Decimal {
    match Decimal::from_str(raw.trim()) {
        Ok(d) if d.is_sign_positive() => d,
        _ => Decimal::ZERO,
    }
}

/// Check that `input` looks like an amount a user is typing.
pub fn is_amount_input(input: &str) -> bool {
    AMOUNT_INPUT.is_match(input)
}

/// Parse a user-entered amount into a strictly positive decimal.
pub fn parse_amount(input: &str) -> Result<Decimal, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "." || !is_amount_input(trimmed) {
        return Err(ValidationError::InvalidAmount(input.to_string()));
    }

    let amount = Decimal::from_str(trimmed)
        .map_err(|_| ValidationError::InvalidAmount(input.to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount(input.to_string()));
    }

    Ok(amount)
}

/// Scale a token-denominated decimal into integer base units.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<U256, ValidationError> {
    let normalized = amount.normalize();
    if normalized.scale() > decimals {
        return Err(ValidationError::TooPrecise { amount, decimals });
    }
    if normalized.is_sign_negative() {
        return Err(ValidationError::InvalidAmount(amount.to_string()));
    }

    // Scale by string to keep the full 256-bit range available.
    let scale = normalized.scale();
    let mantissa = normalized.mantissa().unsigned_abs();
    let digits = format!("{}{}", mantissa, "0".repeat((decimals - scale) as usize));
    U256::from_str(&digits).map_err(|_| ValidationError::InvalidAmount(amount.to_string()))
}

/// Parse a user-entered amount straight into base units.
pub fn parse_units(input: &str, decimals: u32) -> Result<U256, ValidationError> {
    to_base_units(parse_amount(input)?, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn to_decimal_applies_scale() {
        assert_eq!(to_decimal(U256::from(700_000_000u64), 6), Some(dec!(700)));
        assert_eq!(to_decimal(U256::from(1_500_000u64), 6), Some(dec!(1.5)));
        assert_eq!(to_decimal(U256::ZERO, 18), Some(Decimal::ZERO));
    }

    #[test]
    fn to_decimal_rejects_oversized_values() {
        assert_eq!(to_decimal(U256::MAX, 18), None);
        assert_eq!(to_decimal_lossy(U256::MAX, 18), Decimal::ZERO);
    }

    #[test]
    fn to_decimal_handles_base_units_beyond_28_digits() {
        let wei = U256::from(10u8).pow(U256::from(30u8)) + U256::from(5u64) * U256::from(10u8).pow(U256::from(17u8));
        assert_eq!(to_decimal(wei, 18), Some(dec!(1_000_000_000_000.5)));
        assert_eq!(to_decimal(U256::from(15u8), 30), Some(Decimal::ZERO));
        assert_eq!(to_decimal(U256::from(1_234u64), 29), Some(dec!(0.0000000000000000000000000123)));
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("1.2.3").is_err());
        assert!(parse_amount("-5").is_err());
        assert_eq!(parse_amount("12.5").unwrap(), dec!(12.5));
    }

    #[test]
    fn parse_units_scales_to_base_units() {
        assert_eq!(parse_units("10", 6).unwrap(), U256::from(10_000_000u64));
        assert_eq!(parse_units("0.25", 6).unwrap(), U256::from(250_000u64));
        assert_eq!(
            parse_units("1", 18).unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn parse_units_rejects_excess_precision() {
        let err = parse_units("0.0000001", 6).unwrap_err();
        assert!(matches!(err, ValidationError::TooPrecise { decimals: 6, .. }));
    }

    #[test]
    fn partial_input_is_accepted_while_typing() {
        assert!(is_amount_input(""));
        assert!(is_amount_input("12."));
        assert!(!is_amount_input("12a"));
    }

    #[test]
    fn parse_non_negative_defaults_to_zero() {
        assert_eq!(parse_non_negative("700000000"), dec!(700000000));
        assert_eq!(parse_non_negative("nope"), Decimal::ZERO);
        assert_eq!(parse_non_negative("-3"), Decimal::ZERO);
    }
}
