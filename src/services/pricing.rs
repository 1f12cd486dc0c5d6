//! Stay pricing and price labels.
//!
//! Nights are the ceiling of the stay length in whole days; the total is
//! nights times the nightly rate. No rounding is applied to the total.

use serde::Serialize;
use time::{Date, Duration};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Check-out date must be after check-in date")]
    InvalidRange { check_in: Date, check_out: Date },
}

/// Price breakdown for a date range at a nightly rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StayQuote {
    pub check_in: Date,
    pub check_out: Date,
    pub nights: i64,
    pub nightly_rate: f64,
    pub total: f64,
}

/// Nights between two dates; rejects equal or inverted ranges.
///
/// # Errors
///
/// Returns [`PricingError::InvalidRange`] unless `check_out > check_in`.
pub fn nights_between(check_in: Date, check_out: Date) -> Result<i64, PricingError> {
    if check_out <= check_in {
        return Err(PricingError::InvalidRange { check_in, check_out });
    }
    Ok(ceil_days(check_out - check_in))
}

/// Ceiling of a positive span in whole days.
fn ceil_days(span: Duration) -> i64 {
    let seconds = span.whole_seconds();
    let days = seconds.div_euclid(SECONDS_PER_DAY);
    if seconds.rem_euclid(SECONDS_PER_DAY) != 0 || span.subsec_nanoseconds() > 0 {
        days + 1
    } else {
        days
    }
}

/// Quote a stay.
///
/// # Errors
///
/// Returns [`PricingError::InvalidRange`] unless `check_out > check_in`.
#[allow(clippy::cast_precision_loss)]
pub fn quote(check_in: Date, check_out: Date, nightly_rate: f64) -> Result<StayQuote, PricingError> {
    let nights = nights_between(check_in, check_out)?;
    Ok(StayQuote { check_in, check_out, nights, nightly_rate, total: nights as f64 * nightly_rate })
}

/// Render an amount with a currency symbol and thousands separators.
/// Whole amounts drop the decimals: `$1,250`, `$99.50`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_price(amount: f64, symbol: &str) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = group_thousands(cents / 100);
    match cents % 100 {
        0 => format!("{sign}{symbol}{whole}"),
        frac => format!("{sign}{symbol}{whole}.{frac:02}"),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[path = "pricing_test.rs"]
mod tests;
