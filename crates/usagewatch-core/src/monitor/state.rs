//! State owned by the monitor and the transitions applied to it.
//!
//! Everything here is synchronous and clock-injected; the loops in
//! [`machine`](super::machine) call it under a single lock.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::time::Instant;

use super::{MSG_RESTARTING, MSG_UNAVAILABLE, MSG_WAITING};
use crate::usage::reset::{
    days_left_until_reset_from, session_reset_date_time, time_until_session_reset_at,
    week_day_label, week_reset_date_time,
};
use crate::usage::{
    is_login_screen, is_usage_screen, parse_usage_screen, UsageData, UsageDisplay, UsageState,
    UsageView,
};

/// Below this age the "last updated" label reads "just now"
const JUST_NOW: Duration = Duration::from_secs(5);

/// What a single capture did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Login screen detected
    LoginScreen,
    /// Usage data parsed and cached
    Parsed,
    /// Nothing usable yet, still within the loading timeout
    Waiting,
    /// Nothing usable for longer than the loading timeout
    TimedOut,
    /// Scrape miss after good data was seen; state left alone
    Ignored,
}

/// Mutable monitor state: current [`UsageState`], cached data and timers
#[derive(Debug, Default)]
pub struct MonitorState {
    state: UsageState,
    cached: Option<UsageData>,
    last_update: Option<Instant>,
    loading_since: Option<Instant>,
    display: UsageDisplay,
    refreshing: bool,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UsageState {
        &self.state
    }

    pub fn cached(&self) -> Option<&UsageData> {
        self.cached.as_ref()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Snapshot for subscribers
    pub fn view(&self) -> UsageView {
        UsageView {
            state: self.state.clone(),
            display: self.display.clone(),
            refreshing: self.refreshing,
        }
    }

    pub(crate) fn set_state(&mut self, state: UsageState) {
        self.state = state;
    }

    pub(crate) fn set_refreshing(&mut self, refreshing: bool) {
        self.refreshing = refreshing;
    }

    /// Classify one capture and update state accordingly
    pub fn apply_capture<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        now: Instant,
        wall_now: DateTime<Utc>,
        loading_timeout: Duration,
    ) -> CaptureOutcome {
        if is_login_screen(lines) {
            self.state = UsageState::NotAuthenticated;
            self.loading_since = None;
            return CaptureOutcome::LoginScreen;
        }

        if is_usage_screen(lines) {
            if let Some(data) = parse_usage_screen(lines) {
                let label = last_updated_label(Duration::ZERO);
                self.display = derive_display(&data, wall_now, label);
                self.cached = Some(data.clone());
                self.last_update = Some(now);
                self.loading_since = None;
                self.state = UsageState::Loaded(data);
                return CaptureOutcome::Parsed;
            }
        }

        // Once good data was seen, single misses are tolerated indefinitely
        if self.cached.is_some() {
            return CaptureOutcome::Ignored;
        }

        let since = *self.loading_since.get_or_insert(now);
        if now.saturating_duration_since(since) > loading_timeout {
            self.state = UsageState::Error(MSG_UNAVAILABLE.to_string());
            CaptureOutcome::TimedOut
        } else {
            self.state = UsageState::Loading(MSG_WAITING.to_string());
            CaptureOutcome::Waiting
        }
    }

    /// Recompute countdowns and the "last updated" label without a capture
    pub fn tick(&mut self, now: Instant, wall_now: DateTime<Utc>) {
        let label = match self.last_update {
            Some(at) => last_updated_label(now.saturating_duration_since(at)),
            None => self.display.last_updated_ago.clone(),
        };
        self.display = match &self.cached {
            Some(data) => derive_display(data, wall_now, label),
            None => UsageDisplay {
                last_updated_ago: label,
                ..self.display.clone()
            },
        };
    }

    /// Forget cached data ahead of a session restart
    pub fn reset_for_refresh(&mut self) {
        self.cached = None;
        self.loading_since = None;
        self.state = UsageState::Loading(MSG_RESTARTING.to_string());
        self.display = UsageDisplay {
            last_updated_ago: std::mem::take(&mut self.display.last_updated_ago),
            ..UsageDisplay::default()
        };
    }
}

/// Countdowns and reset dates for `data` at `wall_now`
pub fn derive_display(
    data: &UsageData,
    wall_now: DateTime<Utc>,
    last_updated_ago: String,
) -> UsageDisplay {
    let today = wall_now.with_timezone(&Local).date_naive();
    let mut display = UsageDisplay {
        last_updated_ago,
        ..UsageDisplay::default()
    };

    if let Some(raw) = &data.session_reset_raw {
        display.session_countdown = time_until_session_reset_at(raw, wall_now);
        display.session_reset_date_time = session_reset_date_time(raw, wall_now);
    }
    if let Some(raw) = &data.week_reset_raw {
        display.week_days_left = days_left_until_reset_from(raw, today);
        display.week_countdown = display.week_days_left.map(week_day_label);
        display.week_reset_date_time = week_reset_date_time(raw, today);
    }

    display
}

/// "Updated just now" below five seconds, "Updated 42s ago" after
pub fn last_updated_label(elapsed: Duration) -> String {
    if elapsed < JUST_NOW {
        "Updated just now".to_string()
    } else {
        format!("Updated {}s ago", elapsed.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MSG_STARTING;
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_secs(60);

    fn usage_lines() -> Vec<&'static str> {
        vec![
            "Session usage",
            "42% used",
            "Resets 8pm (Europe/Warsaw)",
            "",
            "Weekly usage",
            "60% used",
            "Resets Feb 25 at 7am (Europe/Warsaw)",
        ]
    }

    fn expected_data() -> UsageData {
        UsageData {
            session_percent: Some(42),
            week_percent: Some(60),
            session_reset_raw: Some("8pm (Europe/Warsaw)".to_string()),
            week_reset_raw: Some("Feb 25 at 7am (Europe/Warsaw)".to_string()),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = MonitorState::new();
        assert_eq!(state.state(), &UsageState::Loading(MSG_STARTING.to_string()));
        assert!(state.cached().is_none());
        assert!(!state.is_refreshing());
    }

    #[test]
    fn test_usage_screen_loads() {
        let mut state = MonitorState::new();
        let outcome = state.apply_capture(&usage_lines(), Instant::now(), Utc::now(), TIMEOUT);

        assert_eq!(outcome, CaptureOutcome::Parsed);
        assert_eq!(state.state(), &UsageState::Loaded(expected_data()));
        assert_eq!(state.cached(), Some(&expected_data()));

        let view = state.view();
        assert!(view.display.session_countdown.is_some());
        assert!(view.display.week_days_left.is_some());
        assert_eq!(view.display.last_updated_ago, "Updated just now");
    }

    #[test]
    fn test_login_screen_wins_over_usage_text() {
        let mut state = MonitorState::new();
        let mut lines = usage_lines();
        lines.push("Please run /login");

        let outcome = state.apply_capture(&lines, Instant::now(), Utc::now(), TIMEOUT);
        assert_eq!(outcome, CaptureOutcome::LoginScreen);
        assert_eq!(state.state(), &UsageState::NotAuthenticated);
    }

    #[test]
    fn test_misses_after_data_are_ignored() {
        let start = Instant::now();
        let mut state = MonitorState::new();
        state.apply_capture(&usage_lines(), start, Utc::now(), TIMEOUT);

        for step in 1..=20u64 {
            let now = start + Duration::from_secs(step * 10);
            let outcome = state.apply_capture(&["garbage"], now, Utc::now(), TIMEOUT);
            assert_eq!(outcome, CaptureOutcome::Ignored);
        }
        assert_eq!(state.state(), &UsageState::Loaded(expected_data()));
    }

    #[test]
    fn test_sustained_misses_time_out() {
        let start = Instant::now();
        let mut state = MonitorState::new();
        let empty: &[&str] = &[];

        assert_eq!(
            state.apply_capture(empty, start, Utc::now(), TIMEOUT),
            CaptureOutcome::Waiting
        );
        assert_eq!(state.state(), &UsageState::Loading(MSG_WAITING.to_string()));

        let at_limit = start + TIMEOUT;
        assert_eq!(
            state.apply_capture(empty, at_limit, Utc::now(), TIMEOUT),
            CaptureOutcome::Waiting
        );

        let past = start + Duration::from_secs(61);
        assert_eq!(
            state.apply_capture(empty, past, Utc::now(), TIMEOUT),
            CaptureOutcome::TimedOut
        );
        assert_eq!(state.state(), &UsageState::Error(MSG_UNAVAILABLE.to_string()));

        // recovers as soon as a capture parses
        state.apply_capture(&usage_lines(), past, Utc::now(), TIMEOUT);
        assert_eq!(state.state(), &UsageState::Loaded(expected_data()));
    }

    #[test]
    fn test_login_clears_loading_timer() {
        let start = Instant::now();
        let mut state = MonitorState::new();
        state.apply_capture(&["blank"], start, Utc::now(), TIMEOUT);
        let login = ["Select login method:"];
        state.apply_capture(&login, start + Duration::from_secs(50), Utc::now(), TIMEOUT);

        // timer restarts from the next miss, not from `start`
        let later = start + Duration::from_secs(70);
        let outcome = state.apply_capture(&["blank"], later, Utc::now(), TIMEOUT);
        assert_eq!(outcome, CaptureOutcome::Waiting);
    }

    #[test]
    fn test_usage_text_that_does_not_parse_counts_as_miss() {
        let mut state = MonitorState::new();
        // passes the screen check but no percentage is attributable
        let lines = ["Extra usage", "44% used", "", "", "", "week"];
        let outcome = state.apply_capture(&lines, Instant::now(), Utc::now(), TIMEOUT);
        assert_eq!(outcome, CaptureOutcome::Waiting);
    }

    #[test]
    fn test_tick_updates_last_updated_label() {
        let start = Instant::now();
        let mut state = MonitorState::new();
        state.apply_capture(&usage_lines(), start, Utc::now(), TIMEOUT);

        state.tick(start + Duration::from_secs(3), Utc::now());
        assert_eq!(state.view().display.last_updated_ago, "Updated just now");

        state.tick(start + Duration::from_secs(42), Utc::now());
        let view = state.view();
        assert_eq!(view.display.last_updated_ago, "Updated 42s ago");
        assert!(view.display.session_countdown.is_some());
    }

    #[test]
    fn test_tick_without_data_keeps_empty_label() {
        let mut state = MonitorState::new();
        state.tick(Instant::now(), Utc::now());
        assert_eq!(state.view().display, UsageDisplay::default());
    }

    #[test]
    fn test_reset_for_refresh() {
        let start = Instant::now();
        let mut state = MonitorState::new();
        state.apply_capture(&usage_lines(), start, Utc::now(), TIMEOUT);
        state.tick(start + Duration::from_secs(8), Utc::now());

        state.reset_for_refresh();
        assert!(state.cached().is_none());
        assert_eq!(state.state(), &UsageState::Loading(MSG_RESTARTING.to_string()));

        let display = state.view().display;
        assert_eq!(display.session_countdown, None);
        assert_eq!(display.week_countdown, None);
        assert_eq!(display.last_updated_ago, "Updated 8s ago");
    }

    #[test]
    fn test_last_updated_label() {
        assert_eq!(last_updated_label(Duration::ZERO), "Updated just now");
        assert_eq!(last_updated_label(Duration::from_millis(4999)), "Updated just now");
        assert_eq!(last_updated_label(Duration::from_secs(5)), "Updated 5s ago");
        assert_eq!(last_updated_label(Duration::from_secs(125)), "Updated 125s ago");
    }
}
