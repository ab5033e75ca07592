//! Token amounts in base units.
//!
//! Amounts arrive from untrusted payloads as JSON numbers or decimal strings.
//! Everything is converted to `U256` here; negative, fractional and
//! non-numeric input is rejected before it can reach the quote engine.

use alloy_primitives::U256;
use serde_json::Value;

use super::error::DomainError;

/// Parse a base-unit amount from a decimal string.
///
/// Leading `+` and surrounding whitespace are accepted. A leading `-` is
/// rejected as an illegal amount, even for `-0`.
pub fn parse_amount(raw: &str) -> Result<U256, DomainError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if digits.starts_with('-') {
        return Err(DomainError::illegal(format!("negative amount {trimmed}")));
    }
    if digits.is_empty() {
        return Err(DomainError::illegal("empty amount"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::illegal(format!(
            "amount {trimmed} is not an integer in base units"
        )));
    }

    U256::from_str_radix(digits, 10).map_err(|_| DomainError::ArithmeticOverflow {
        context: "parsing an amount",
    })
}

/// Parse a base-unit amount from a JSON value (number or string).
pub fn amount_from_json(value: &Value) -> Result<U256, DomainError> {
    match value {
        Value::String(s) => parse_amount(s),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok(U256::from(v))
            } else if n.as_i64().is_some() {
                Err(DomainError::illegal(format!("negative amount {n}")))
            } else {
                // Floats lose precision above 2^53 and cannot be base units.
                Err(DomainError::illegal(format!(
                    "amount {n} is not an integer in base units"
                )))
            }
        }
        other => Err(DomainError::illegal(format!(
            "expected a number or string amount, got {other}"
        ))),
    }
}

/// Convert a human amount such as `0.1` into base units with `decimals`.
///
/// Exact: no floating point is involved. More fractional digits than
/// `decimals` is an error rather than a silent truncation.
pub fn parse_units(text: &str, decimals: u8) -> Result<U256, DomainError> {
    let text = text.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };

    if frac.len() > usize::from(decimals) {
        return Err(DomainError::illegal(format!(
            "{text} has more than {decimals} decimal places"
        )));
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::illegal(format!("{text} is not a decimal amount")));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let padded = format!("{whole}{frac:0<width$}", width = usize::from(decimals));
    parse_amount(&padded)
}

/// Render base units as a decimal string with `decimals` places, trimming
/// trailing zeros.
#[must_use]
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_plain_integers() {
        assert_eq!(parse_amount("10000").unwrap(), U256::from(10_000u64));
        assert_eq!(parse_amount(" +7 ").unwrap(), U256::from(7u64));
    }

    #[test]
    fn parses_values_beyond_u128() {
        let raw = "1000000000000000000000000000000000000000000";
        let parsed = parse_amount(raw).unwrap();
        assert_eq!(parsed.to_string(), raw);
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(matches!(
            parse_amount("-1"),
            Err(DomainError::IllegalAmount { .. })
        ));
        assert!(matches!(
            parse_amount("1.5"),
            Err(DomainError::IllegalAmount { .. })
        ));
        assert!(matches!(
            parse_amount(""),
            Err(DomainError::IllegalAmount { .. })
        ));
    }

    #[test]
    fn rejects_values_beyond_u256() {
        let raw = "9".repeat(80);
        assert!(matches!(
            parse_amount(&raw),
            Err(DomainError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn json_numbers_and_strings() {
        assert_eq!(amount_from_json(&json!(5)).unwrap(), U256::from(5u64));
        assert_eq!(amount_from_json(&json!("5")).unwrap(), U256::from(5u64));
        assert!(matches!(
            amount_from_json(&json!(-1)),
            Err(DomainError::IllegalAmount { .. })
        ));
        assert!(matches!(
            amount_from_json(&json!(0.5)),
            Err(DomainError::IllegalAmount { .. })
        ));
        assert!(matches!(
            amount_from_json(&json!(null)),
            Err(DomainError::IllegalAmount { .. })
        ));
    }

    #[test]
    fn units_conversion_is_exact() {
        let yocto = parse_units("0.1", 24).unwrap();
        assert_eq!(yocto.to_string(), "100000000000000000000000");
        assert_eq!(parse_units("12", 6).unwrap(), U256::from(12_000_000u64));
        assert!(parse_units("0.0000001", 6).is_err());
    }

    #[test]
    fn formats_units() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(42u64), 6), "0.000042");
        assert_eq!(format_units(U256::from(3_000_000u64), 6), "3");
        assert_eq!(format_units(U256::from(9u64), 0), "9");
    }
}
