//! Display formatting for metric before/after values.
//!
//! These formats are read back by savings aggregation, so they are part of
//! the output contract:
//! - latency: seconds with one decimal, `"12.0s"`
//! - cost: dollars, `"$0.123"` (four decimals below one cent)
//! - tokens: comma-grouped integers, `"1,234"`

// Rounded display values only
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

/// Format milliseconds as seconds with one decimal.
#[must_use]
pub fn format_latency(ms: f64) -> String {
    format!("{:.1}s", ms.max(0.0) / 1000.0)
}

/// Format a dollar amount.
#[must_use]
pub fn format_cost(dollars: f64) -> String {
    let dollars = dollars.max(0.0);
    if dollars > 0.0 && dollars < 0.01 {
        format!("${dollars:.4}")
    } else {
        format!("${dollars:.3}")
    }
}

/// Format a token count with thousands separators.
#[must_use]
pub fn format_tokens(tokens: f64) -> String {
    group_thousands(tokens.max(0.0).round() as u64)
}

/// Format a plain count.
#[must_use]
pub fn format_count(count: f64) -> String {
    format!("{}", count.max(0.0).round() as u64)
}

/// Format a `0.0..=1.0` score with two decimals.
#[must_use]
pub fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

/// Format a temperature setting.
#[must_use]
pub fn format_temperature(temperature: f64) -> String {
    format!("{temperature:.1}")
}

/// Percentage change from `before` to `after`, one decimal.
///
/// `None` when `before` is zero or either value is not finite.
#[must_use]
pub fn change_percent(before: f64, after: f64) -> Option<f64> {
    if before == 0.0 || !before.is_finite() || !after.is_finite() {
        return None;
    }
    Some(round1((after - before) / before * 100.0))
}

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
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
