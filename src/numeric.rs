//! Rounding and parsing helpers shared by the calibration and session code.
//!
//! Every float stored by the crate passes through [`round_n`] at the point of
//! entry, so values compare exactly once they are stored.

use crate::error::{AppResult, DaqError};

/// Decimal precision applied to every stored voltage, temperature and coefficient.
pub const N_DECIMALS: u32 = 3;

/// Rounds `value` to `decimals` digits, half away from zero.
///
/// Negative zero is normalized to `+0.0` so that formatting never yields `-0.000`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // -0.0 + 0.0 == +0.0
    rounded + 0.0
}

/// Rounds `value` to [`N_DECIMALS`] digits.
pub fn round_n(value: f64) -> f64 {
    round_to(value, N_DECIMALS)
}

/// Fails with [`DaqError::InvalidInput`] unless `value` is finite.
pub fn ensure_finite(name: &str, value: f64) -> AppResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DaqError::InvalidInput(format!(
            "'{name}' must be a finite number, got {value}"
        )))
    }
}

/// Validates and rounds a value in one step.
pub fn finite_rounded(name: &str, value: f64) -> AppResult<f64> {
    ensure_finite(name, value).map(round_n)
}

/// Returns true for an optional leading `-` followed by digits with at most one `.`.
///
/// Exponents, a leading `+` and surrounding whitespace are rejected.
pub fn is_number(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// Parses user-entered text into a rounded float.
pub fn parse_number(text: &str) -> AppResult<f64> {
    if !is_number(text) {
        return Err(DaqError::InvalidInput(format!("'{text}' is not a number")));
    }
    let value: f64 = text
        .parse()
        .map_err(|e| DaqError::InvalidInput(format!("'{text}' is not a number: {e}")))?;
    finite_rounded("value", value)
}

/// Frequency for a period, in the reciprocal of the period's unit.
pub fn frequency_from_period(period: f64) -> AppResult<f64> {
    let period = ensure_finite("period", period)?;
    if period == 0.0 {
        return Err(DaqError::InvalidInput("period cannot be zero".into()));
    }
    Ok(1.0 / period)
}

/// Sampling period in milliseconds for a rate in hertz.
pub fn period_ms_from_rate(rate_hz: f64) -> AppResult<f64> {
    let rate = ensure_finite("sample rate", rate_hz)?;
    if rate == 0.0 {
        return Err(DaqError::InvalidInput("sample rate cannot be zero".into()));
    }
    Ok(1000.0 / rate)
}
