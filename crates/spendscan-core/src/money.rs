//! Fixed-point currency helpers
//!
//! Amounts are stored as integer cents everywhere. Decimal strings only
//! appear at the edges (OCR output, CLI input, display).

use crate::error::{Error, Result};

/// Parse a decimal amount string (e.g. "12.34", "7", "0.50") into cents.
///
/// Accepts an optional leading minus sign and at most two fractional
/// digits. Anything else is a validation error.
pub fn parse_cents(s: &str) -> Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::Validation("empty amount".to_string()));
    }

    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(Error::Validation(format!("invalid amount: {}", s)));
    }
    if frac.len() > 2 {
        return Err(Error::Validation(format!(
            "amount has more than two decimal places: {}",
            s
        )));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!("invalid amount: {}", s)));
    }

    let whole_val: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| Error::Validation(format!("amount out of range: {}", s)))?
    };
    let frac_val: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().unwrap_or(0) * 10,
        _ => frac.parse::<i64>().unwrap_or(0),
    };

    whole_val
        .checked_mul(100)
        .and_then(|w| w.checked_add(frac_val))
        .map(|v| sign * v)
        .ok_or_else(|| Error::Validation(format!("amount out of range: {}", s)))
}

/// Format cents as a decimal string with two fractional digits.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
