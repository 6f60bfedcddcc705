//! Display helpers for addresses, token amounts, percentages and dates.

use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::units;

/// Shorten an address to `0x1234...abcd`.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Format base units as a token amount with 2 to 4 fraction digits and thousands separators.
pub fn format_amount(value: U256, decimals: u32) -> String {
    format_decimal(units::to_decimal_lossy(value, decimals))
}

/// Format a decimal with 2 to 4 fraction digits and thousands separators.
pub fn format_decimal(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < 2 {
        frac.push('0');
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(int_part), frac)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a USD price from 8-decimal feed units: `$1,234.56`.
pub fn format_price(value: U256) -> String {
    format!("${}", format_amount(value, units::PRICE_DECIMALS))
}

/// Format a percentage with one decimal: `70.0%`.
pub fn format_percentage(value: Decimal) -> String {
    format!("{:.1}%", value.round_dp(1))
}

/// Format a unix timestamp as e.g. `Tue, Jan 2, 2024, 3:04 PM UTC`.
pub fn format_date(timestamp: i64) -> String {
    let format = format_description!(
        "[weekday repr:short], [month repr:short] [day padding:none], [year], [hour repr:12 padding:none]:[minute] [period] UTC"
    );
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Truncate text to `max_len` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_len).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn address_is_shortened() {
        assert_eq!(
            format_address("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            "0x5FbD...0aa3"
        );
        assert_eq!(format_address("0x12"), "0x12");
    }

    #[test]
    fn amounts_use_two_to_four_fraction_digits() {
        assert_eq!(format_amount(U256::from(700_000_000u64), 6), "700.00");
        assert_eq!(format_amount(U256::from(1_234_567_891u64), 6), "1,234.5679");
        assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.50");
        assert_eq!(format_decimal(dec!(1234567)), "1,234,567.00");
    }

    #[test]
    fn prices_use_feed_decimals() {
        assert_eq!(format_price(U256::from(6_700_045_000_000u64)), "$67,000.45");
    }

    #[test]
    fn percentage_has_one_decimal() {
        assert_eq!(format_percentage(dec!(70)), "70.0%");
        assert_eq!(format_percentage(dec!(33.3333)), "33.3%");
    }

    #[test]
    fn date_is_human_readable() {
        assert_eq!(format_date(1_704_207_840), "Tue, Jan 2, 2024, 3:04 PM UTC");
    }

    #[test]
    fn text_is_truncated_with_ellipsis() {
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hi", 5), "hi");
    }
}
