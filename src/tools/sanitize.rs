//! Normalization of planner-supplied swap arguments.
//!
//! The planner frequently emits token amounts in whole units ("5") instead of
//! base units, and stale or missing deadlines. Amounts below
//! [`SMALL_AMOUNT_THRESHOLD`] are treated as whole units of an 18-decimal token
//! and scaled up. This is a heuristic: a token with fewer decimals, or a
//! genuinely tiny base-unit amount, will be mis-scaled.

use alloy_primitives::U256;
use serde::Deserialize;

use crate::tools::ToolError;
use crate::tools::tool::lenient_string;

/// Positive amounts strictly below this are assumed to be whole token units.
pub const SMALL_AMOUNT_THRESHOLD: u64 = 1_000_000_000_000;
/// Base units per whole token for the assumed 18 decimals.
pub const SCALE_FACTOR: u128 = 1_000_000_000_000_000_000;
/// Seconds added to "now" when the supplied deadline is unusable.
pub const DEADLINE_GRACE_SECS: u64 = 900;

/// Arguments of `execute_vault_swap` as the planner sent them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSwapArgs {
    pub vault_address: String,
    pub user: String,
    pub token_in: String,
    pub token_out: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_in: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub min_amount_out: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub deadline: Option<String>,
}

/// Swap arguments ready to be encoded into `executeSwap` calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedSwap {
    pub vault: String,
    pub user: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub deadline: U256,
}

/// Sanitize against the current wall clock.
pub fn sanitize_swap(raw: RawSwapArgs) -> Result<SanitizedSwap, ToolError> {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    sanitize_swap_at(raw, now)
}

/// Sanitize against `now` (unix seconds).
pub fn sanitize_swap_at(raw: RawSwapArgs, now: u64) -> Result<SanitizedSwap, ToolError> {
    let amount_in = scale_small_amount(parse_amount(raw.amount_in.as_deref(), "amountIn")?);
    let mut min_amount_out =
        scale_small_amount(parse_amount(raw.min_amount_out.as_deref(), "minAmountOut")?);
    if min_amount_out.is_zero() {
        min_amount_out = U256::from(1u64);
    }

    let now_u256 = U256::from(now);
    let deadline = match raw.deadline.as_deref().map(parse_integer_literal) {
        Some(Some(IntegerLiteral { negative: false, magnitude })) if magnitude >= now_u256 => {
            magnitude
        }
        _ => now_u256 + U256::from(DEADLINE_GRACE_SECS),
    };

    Ok(SanitizedSwap {
        vault: raw.vault_address,
        user: raw.user,
        token_in: raw.token_in,
        token_out: raw.token_out,
        amount_in,
        min_amount_out,
        deadline,
    })
}

/// A parsed integer literal. The sign is kept apart so a negative value can
/// be reported instead of silently wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IntegerLiteral {
    negative: bool,
    magnitude: U256,
}

/// Parse an integer literal: blank is zero, otherwise either a decimal with an
/// optional `+`/`-` sign or an unsigned `0x`, `0o` or `0b` literal. Returns
/// `None` for anything else, including values that overflow 256 bits.
fn parse_integer_literal(raw: &str) -> Option<IntegerLiteral> {
    let text = raw.trim();
    if text.is_empty() {
        return Some(IntegerLiteral {
            negative: false,
            magnitude: U256::ZERO,
        });
    }

    let prefix = text.get(..2).map(str::to_ascii_lowercase);
    let radix = match prefix.as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let (negative, digits, radix) = match radix {
        Some(radix) => (false, &text[2..], radix),
        None => match text.as_bytes()[0] {
            b'+' => (false, &text[1..], 10),
            b'-' => (true, &text[1..], 10),
            _ => (false, text, 10),
        },
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = U256::from_str_radix(digits, radix as u64).ok()?;
    Some(IntegerLiteral {
        negative: negative && !magnitude.is_zero(),
        magnitude,
    })
}

/// Absent or blank is zero; negative values and non-integers are rejected.
fn parse_amount(raw: Option<&str>, field: &str) -> Result<U256, ToolError> {
    let text = raw.unwrap_or_default();
    match parse_integer_literal(text) {
        Some(IntegerLiteral {
            negative: false,
            magnitude,
        }) => Ok(magnitude),
        Some(IntegerLiteral { negative: true, .. }) => Err(ToolError::InvalidParameters(
            format!("{field} must not be negative, got '{}'", text.trim()),
        )),
        None => Err(ToolError::InvalidParameters(format!(
            "{field} must be an integer literal that fits in uint256, got '{}'",
            text.trim()
        ))),
    }
}

fn scale_small_amount(value: U256) -> U256 {
    if !value.is_zero() && value < U256::from(SMALL_AMOUNT_THRESHOLD) {
        value * U256::from(SCALE_FACTOR)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn raw(amount_in: &str, min_out: &str, deadline: &str) -> RawSwapArgs {
        RawSwapArgs {
            vault_address: "0xdfA8A83B0941F1d3ec47AD3BfEAE9D929E29b915".to_string(),
            user: "0x1111111111111111111111111111111111111111".to_string(),
            token_in: "0xcB856bC5Aa2664E47c9caDce6fF65117c5201a1C".to_string(),
            token_out: "0xBBd3EDd4D3b519c0d14965d9311185CFaC8c3220".to_string(),
            amount_in: Some(amount_in.to_string()),
            min_amount_out: Some(min_out.to_string()),
            deadline: Some(deadline.to_string()),
        }
    }

    fn wei(n: u128) -> U256 {
        U256::from(n)
    }

    #[test]
    fn test_small_amounts_scaled_to_base_units() {
        let swap = sanitize_swap_at(raw("5", "1", "0"), NOW).unwrap();
        assert_eq!(swap.amount_in, wei(5_000_000_000_000_000_000));
        assert_eq!(swap.min_amount_out, wei(1_000_000_000_000_000_000));

        let edge = sanitize_swap_at(raw("999999999999", "0", "0"), NOW).unwrap();
        assert_eq!(edge.amount_in, wei(999_999_999_999) * U256::from(SCALE_FACTOR));
    }

    #[test]
    fn test_amounts_at_or_above_threshold_unchanged() {
        let swap = sanitize_swap_at(raw("1000000000000", "5000000000000000000", "0"), NOW).unwrap();
        assert_eq!(swap.amount_in, wei(1_000_000_000_000));
        assert_eq!(swap.min_amount_out, wei(5_000_000_000_000_000_000));
    }

    #[test]
    fn test_zero_or_absent_amounts() {
        let swap = sanitize_swap_at(raw("0", "0", "0"), NOW).unwrap();
        assert_eq!(swap.amount_in, U256::ZERO);
        assert_eq!(swap.min_amount_out, U256::from(1u64));

        let mut absent = raw("", "", "");
        absent.amount_in = None;
        absent.min_amount_out = None;
        absent.deadline = None;
        let swap = sanitize_swap_at(absent, NOW).unwrap();
        assert_eq!(swap.amount_in, U256::ZERO);
        assert_eq!(swap.min_amount_out, U256::from(1u64));
        assert_eq!(swap.deadline, U256::from(NOW + DEADLINE_GRACE_SECS));
    }

    #[test]
    fn test_deadline_policy() {
        let past = sanitize_swap_at(raw("5", "1", &(NOW - 1).to_string()), NOW).unwrap();
        assert_eq!(past.deadline, U256::from(NOW + DEADLINE_GRACE_SECS));

        let garbage = sanitize_swap_at(raw("5", "1", "tomorrow"), NOW).unwrap();
        assert_eq!(garbage.deadline, U256::from(NOW + DEADLINE_GRACE_SECS));

        let exact = sanitize_swap_at(raw("5", "1", &NOW.to_string()), NOW).unwrap();
        assert_eq!(exact.deadline, U256::from(NOW));

        let future = sanitize_swap_at(raw("5", "1", &(NOW + 60).to_string()), NOW).unwrap();
        assert_eq!(future.deadline, U256::from(NOW + 60));
    }

    #[test]
    fn test_non_integer_amount_rejected() {
        let err = sanitize_swap_at(raw("1.5", "1", "0"), NOW).unwrap_err();
        assert!(err.to_string().contains("amountIn"));
        assert!(sanitize_swap_at(raw("5", "abc", "0"), NOW).is_err());
    }

    #[test]
    fn test_integer_literal_forms_accepted() {
        let five_eth = wei(5_000_000_000_000_000_000);
        for literal in ["0x4563918244f40000", "0X4563918244F40000", "+5", " 5 ", "0b101", "0o5"] {
            let swap = sanitize_swap_at(raw(literal, "1", "0"), NOW).unwrap();
            assert_eq!(swap.amount_in, five_eth, "amountIn {literal}");
        }
        assert_eq!(sanitize_swap_at(raw("-0", "0", "0"), NOW).unwrap().amount_in, U256::ZERO);
    }

    #[test]
    fn test_malformed_literals_rejected() {
        for literal in ["0x", "+", "-0x5", "0x5g", "5_000", "1.5", "1e18"] {
            let err = sanitize_swap_at(raw(literal, "1", "0"), NOW).unwrap_err();
            assert!(err.to_string().contains("amountIn"), "{literal}: {err}");
        }
        let too_big = format!("0x1{}", "0".repeat(64));
        assert!(sanitize_swap_at(raw(&too_big, "1", "0"), NOW).is_err());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = sanitize_swap_at(raw("-5", "1", "0"), NOW).unwrap_err();
        assert!(err.to_string().contains("must not be negative"));
        assert!(sanitize_swap_at(raw("5", "-1", "0"), NOW).is_err());
    }

    #[test]
    fn test_deadline_literal_forms() {
        let future = NOW + 60;
        for literal in [format!("0x{future:x}"), format!("+{future}"), format!(" {future} ")] {
            let swap = sanitize_swap_at(raw("5", "1", &literal), NOW).unwrap();
            assert_eq!(swap.deadline, U256::from(future), "deadline {literal}");
        }
        let negative = sanitize_swap_at(raw("5", "1", "-1"), NOW).unwrap();
        assert_eq!(negative.deadline, U256::from(NOW + DEADLINE_GRACE_SECS));
    }

    #[test]
    fn test_integral_json_floats_accepted() {
        for amount in [serde_json::json!(5.0), serde_json::json!(5e18)] {
            let args: RawSwapArgs = serde_json::from_value(serde_json::json!({
                "vaultAddress": "0xdfA8A83B0941F1d3ec47AD3BfEAE9D929E29b915",
                "user": "0x1111111111111111111111111111111111111111",
                "tokenIn": "0xcB856bC5Aa2664E47c9caDce6fF65117c5201a1C",
                "tokenOut": "0xBBd3EDd4D3b519c0d14965d9311185CFaC8c3220",
                "amountIn": amount,
                "minAmountOut": 0,
                "deadline": 1.9e9
            }))
            .unwrap();
            let swap = sanitize_swap_at(args, NOW).unwrap();
            assert_eq!(swap.amount_in, wei(5_000_000_000_000_000_000), "amountIn {amount}");
            assert_eq!(swap.deadline, U256::from(1_900_000_000u64));
        }
    }

    #[test]
    fn test_addresses_pass_through() {
        let input = raw("5", "1", "0");
        let swap = sanitize_swap_at(input.clone(), NOW).unwrap();
        assert_eq!(swap.vault, input.vault_address);
        assert_eq!(swap.user, input.user);
        assert_eq!(swap.token_in, input.token_in);
        assert_eq!(swap.token_out, input.token_out);
    }

    #[test]
    fn test_numeric_json_fields_accepted() {
        let args: RawSwapArgs = serde_json::from_value(serde_json::json!({
            "vaultAddress": "0xdfA8A83B0941F1d3ec47AD3BfEAE9D929E29b915",
            "user": "0x1111111111111111111111111111111111111111",
            "tokenIn": "0xcB856bC5Aa2664E47c9caDce6fF65117c5201a1C",
            "tokenOut": "0xBBd3EDd4D3b519c0d14965d9311185CFaC8c3220",
            "amountIn": 5,
            "minAmountOut": null,
            "deadline": 1900000000u64
        }))
        .unwrap();
        let swap = sanitize_swap_at(args, NOW).unwrap();
        assert_eq!(swap.amount_in, wei(5_000_000_000_000_000_000));
        assert_eq!(swap.min_amount_out, U256::from(1u64));
        assert_eq!(swap.deadline, U256::from(1_900_000_000u64));
    }
}
