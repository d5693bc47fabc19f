//! Colour bands for usage percentages.

use serde::Serialize;

/// How close a meter is to its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    /// Comfortably within the limit
    Low,
    /// Worth keeping an eye on
    Moderate,
    /// Close to (or past) the limit
    High,
}

/// Fixed thresholds: 80% and up is high, 50% and up is moderate
pub fn usage_level(percent: u32) -> UsageLevel {
    if percent >= 80 {
        UsageLevel::High
    } else if percent >= 50 {
        UsageLevel::Moderate
    } else {
        UsageLevel::Low
    }
}

/// Pace-aware band for the weekly meter.
///
/// Compares usage against the share of the week already elapsed, so 90% on
/// the last day is fine while 50% on the first day is not. Without a known
/// `days_left` this is [`usage_level`].
pub fn weekly_usage_level(percent: u32, days_left: Option<i64>) -> UsageLevel {
    let Some(days_left) = days_left else {
        return usage_level(percent);
    };

    let expected = (8 - days_left) as f64 / 7.0 * 100.0;
    let percent = percent as f64;
    if percent < expected {
        UsageLevel::Low
    } else if percent < expected + 20.0 {
        UsageLevel::Moderate
    } else {
        UsageLevel::High
    }
}
