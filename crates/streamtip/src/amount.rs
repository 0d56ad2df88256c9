//! Decimal amount parsing into integer base units.
//!
//! Integer-only: the decimal string is split at the point and each side is
//! parsed as an integer. No `f64` anywhere in the pipeline, so `0.015` CHZ is
//! exactly `15000000000000000` wei. Fraction digits past `decimals` are
//! truncated, which floors the result and never overspends.

use alloy::primitives::U256;

use crate::TipError;

/// Parse a user-entered decimal amount (e.g. `"0.015"`) into base units.
///
/// Rejects empty, negative, non-numeric and zero amounts, including amounts
/// that floor to zero base units.
pub fn parse_amount(amount: &str, decimals: u32) -> Result<U256, TipError> {
    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(TipError::InvalidAmount(format!(
            "'{amount}' must be greater than 0"
        )));
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (integer_part, fractional_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    if integer_part.is_empty() && fractional_part.is_empty() {
        return Err(TipError::InvalidAmount(format!(
            "'{amount}': no numeric content"
        )));
    }

    // A second '.' lands in the fractional part and fails here too.
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(integer_part) || !all_digits(fractional_part) {
        return Err(TipError::InvalidAmount(format!("'{amount}' is not a number")));
    }

    let decimals_len = decimals as usize;
    let frac = if fractional_part.len() > decimals_len {
        &fractional_part[..decimals_len]
    } else {
        fractional_part
    };

    let integer = parse_digits(integer_part, amount)?;
    let fractional = parse_digits(frac, amount)?;

    let ten = U256::from(10u64);
    let multiplier = ten.pow(U256::from(decimals));
    let scale = ten.pow(U256::from(decimals_len - frac.len()));

    let value = integer
        .checked_mul(multiplier)
        .and_then(|whole| {
            fractional
                .checked_mul(scale)
                .and_then(|part| whole.checked_add(part))
        })
        .ok_or_else(|| TipError::InvalidAmount(format!("'{amount}': overflow")))?;

    if value.is_zero() {
        return Err(TipError::InvalidAmount(format!(
            "'{amount}' must be greater than 0"
        )));
    }

    Ok(value)
}

fn parse_digits(digits: &str, original: &str) -> Result<U256, TipError> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    digits
        .parse::<U256>()
        .map_err(|e| TipError::InvalidAmount(format!("'{original}': {e}")))
}

/// Render base units as a decimal string with trailing zeros trimmed.
pub fn format_units(value: U256, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{digits}", "0".repeat(decimals + 1 - digits.len()))
    } else {
        digits
    };
    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}
