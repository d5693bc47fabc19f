//! Usage data types parsed from the Claude Code `/usage` screen.

use serde::Serialize;

/// One of the two usage categories shown on the `/usage` screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Rolling session window (e.g. "Current session")
    Session,
    /// Weekly window (e.g. "Current week (all models)")
    Week,
}

/// Usage figures extracted from a single screen capture.
///
/// Produced only by a successful parse and replaced wholesale by the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageData {
    /// Session percentage used (may exceed 100)
    pub session_percent: Option<u32>,
    /// Week percentage used (may exceed 100)
    pub week_percent: Option<u32>,
    /// Raw session reset description, e.g. "8pm (Europe/Warsaw)"
    pub session_reset_raw: Option<String>,
    /// Raw week reset description, e.g. "Feb 25 at 7am (Europe/Warsaw)"
    pub week_reset_raw: Option<String>,
}

impl UsageData {
    /// A parse only counts when at least one percentage was found
    pub fn has_percentages(&self) -> bool {
        self.session_percent.is_some() || self.week_percent.is_some()
    }

    pub(crate) fn percent_mut(&mut self, section: Section) -> &mut Option<u32> {
        match section {
            Section::Session => &mut self.session_percent,
            Section::Week => &mut self.week_percent,
        }
    }

    pub(crate) fn reset_raw_mut(&mut self, section: Section) -> &mut Option<String> {
        match section {
            Section::Session => &mut self.session_reset_raw,
            Section::Week => &mut self.week_reset_raw,
        }
    }
}

/// Observable state of the usage monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UsageState {
    /// Waiting for the session or for the first usable capture
    Loading(String),
    /// Fresh usage data is available
    Loaded(UsageData),
    /// Claude Code is showing a login screen
    NotAuthenticated,
    /// No usable data, or the environment is unusable
    Error(String),
}

impl UsageState {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            UsageState::Loading(_) => "loading",
            UsageState::Loaded(_) => "loaded",
            UsageState::NotAuthenticated => "not_authenticated",
            UsageState::Error(_) => "error",
        }
    }
}

impl Default for UsageState {
    fn default() -> Self {
        UsageState::Loading(crate::monitor::MSG_STARTING.to_string())
    }
}

/// Display fields derived from the last [`UsageData`]; recomputed every tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageDisplay {
    /// Time until the session resets, e.g. "2h05m"
    pub session_countdown: Option<String>,
    /// Local wall-clock time of the next session reset, e.g. "20:00"
    pub session_reset_date_time: Option<String>,
    /// Whole days until the weekly reset
    pub week_days_left: Option<i64>,
    /// Day-of-cycle label, e.g. "4/7"
    pub week_countdown: Option<String>,
    /// Local date (and time, when known) of the weekly reset
    pub week_reset_date_time: Option<String>,
    /// "Updated just now" / "Updated 12s ago"
    pub last_updated_ago: String,
}

/// Snapshot published to subscribers after every state change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageView {
    /// Current monitor state
    pub state: UsageState,
    /// Derived countdowns and labels
    pub display: UsageDisplay,
    /// A `refresh()` is restarting the session
    pub refreshing: bool,
}
