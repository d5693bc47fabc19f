//! Usage monitoring: parse the Claude Code `/usage` screen.
//!
//! The screen is captured from a hidden tmux session, classified, parsed into
//! [`UsageData`], and turned into countdowns for display.

pub mod level;
pub mod parser;
pub mod reset;
pub mod types;

pub use level::{usage_level, weekly_usage_level, UsageLevel};
pub use parser::{is_login_screen, is_usage_screen, parse_usage_screen};
pub use reset::{
    days_left_until_reset, time_until_session_reset, week_day_label, week_reset_date_time,
};
pub use types::{Section, UsageData, UsageDisplay, UsageState, UsageView};
