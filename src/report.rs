//! JSON report for the `parse` subcommand.

use chrono::{DateTime, Utc};
use serde::Serialize;

use usagewatch_core::monitor::{derive_display, last_updated_label};
use usagewatch_core::usage::{
    is_login_screen, is_usage_screen, parse_usage_screen, UsageData, UsageDisplay,
};

/// What the monitor would make of a single capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub usage_screen: bool,
    pub login_screen: bool,
    pub data: Option<UsageData>,
    pub display: Option<UsageDisplay>,
}

impl ParseReport {
    pub fn from_capture(text: &str, now: DateTime<Utc>) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let data = parse_usage_screen(&lines);
        let display = data
            .as_ref()
            .map(|data| derive_display(data, now, last_updated_label(Default::default())));

        Self {
            usage_screen: is_usage_screen(&lines),
            login_screen: is_login_screen(&lines),
            data,
            display,
        }
    }
}
