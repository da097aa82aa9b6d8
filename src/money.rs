//! Amounts are integer centavos; these helpers render them for the gateway and for humans.

use std::str::FromStr;

use rust_decimal::{Decimal, prelude::ToPrimitive};

/// `1050` -> `"10.50"`, the decimal format the PIX API expects.
pub fn to_decimal_string(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// `"10.5"` -> `1050`. Extra fractional digits are truncated; negative or
/// out-of-range amounts are rejected.
pub fn parse_decimal_string(value: &str) -> Option<i64> {
    let amount = Decimal::from_str(value.trim()).ok()?;
    if amount.is_sign_negative() {
        return None;
    }
    amount.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
}

pub fn format_brl(cents: i64) -> String {
    format!("R$ {}", to_decimal_string(cents))
}
