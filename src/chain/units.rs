//! Conversion between human decimal amounts and integer base units.

use alloy_primitives::U256;

use crate::error::ChainError;

/// Decimals assumed for ETH and for every ERC20 the tools touch.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Parse a non-negative decimal amount such as `"1.5"` into base units.
pub fn parse_units(raw: &str, decimals: u8, field: &str) -> Result<U256, ChainError> {
    let invalid = |reason: &str| ChainError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{raw}' {reason}"),
    };

    let trimmed = raw.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("is not a decimal amount"));
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid("is not a decimal amount"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!("has more than {decimals} fractional digits")));
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat_n('0', decimals as usize - fraction.len()));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| invalid("does not fit in 256 bits"))
}

/// Render base units as a decimal string without trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    let (whole, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("5", 18, "amount").unwrap(), eth(5));
        assert_eq!(
            parse_units("1.5", 18, "amount").unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(parse_units(".25", 2, "amount").unwrap(), U256::from(25u64));
        assert_eq!(parse_units("0", 18, "amount").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(parse_units("", 18, "amount").is_err());
        assert!(parse_units("-1", 18, "amount").is_err());
        assert!(parse_units("1e18", 18, "amount").is_err());
        assert!(parse_units("0.123", 2, "amount").is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(eth(5), 18), "5");
        assert_eq!(format_units(U256::from(1_500_000_000_000_000_000u128), 18), "1.5");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }
}
