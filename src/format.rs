//! Status-bar rendering of a [`UsageView`]: style presets and a small
//! `{placeholder}` template engine.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use usagewatch_core::usage::{
    usage_level, weekly_usage_level, UsageData, UsageDisplay, UsageLevel, UsageState, UsageView,
};

/// Shown instead of a missing percentage
const MISSING_PERCENT: &str = "\u{2014}";
/// Shown instead of any other missing value
const MISSING_VALUE: &str = "?";

const ICON_LOADING: &str = "\u{23F3}";
const ICON_ERROR: &str = "\u{26A0}\u{FE0F}";
const ICON_LOCKED: &str = "\u{1F512}";

/// Built-in status-bar layouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatusBarStyle {
    /// `42%`
    #[default]
    Session,
    /// `S:42% W:60%`
    SessionWeek,
    /// `S:42%(1h30m) W:60%(4/7)`
    Countdowns,
}

impl StatusBarStyle {
    /// Template equivalent of the preset
    pub fn template(self) -> &'static str {
        match self {
            StatusBarStyle::Session => "{s}",
            StatusBarStyle::SessionWeek => "S:{s} W:{w}",
            StatusBarStyle::Countdowns => "S:{s}({sr}) W:{w}({wr})",
        }
    }
}

/// Renders views with a fixed template
#[derive(Debug, Clone)]
pub struct StatusLine {
    template: String,
    tmux_colors: bool,
}

impl StatusLine {
    /// Use `format` when given, otherwise the preset's template
    pub fn new(style: StatusBarStyle, format: Option<&str>, tmux_colors: bool) -> Self {
        Self {
            template: format.unwrap_or(style.template()).to_string(),
            tmux_colors,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// One status line for `view`; non-loaded states collapse to an icon
    pub fn render(&self, view: &UsageView) -> String {
        match &view.state {
            UsageState::Loading(_) => ICON_LOADING.to_string(),
            UsageState::Error(_) => ICON_ERROR.to_string(),
            UsageState::NotAuthenticated => ICON_LOCKED.to_string(),
            UsageState::Loaded(data) => {
                render_template(&self.template, data, &view.display, self.tmux_colors)
            }
        }
    }
}

/// Substitute every known `{name}` in `template`; unknown names are kept as-is
pub fn render_template(
    template: &str,
    data: &UsageData,
    display: &UsageDisplay,
    tmux_colors: bool,
) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match placeholder(name, data, display, tmux_colors) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn placeholder(
    name: &str,
    data: &UsageData,
    display: &UsageDisplay,
    tmux_colors: bool,
) -> Option<String> {
    let value = match name {
        "s" => {
            let level = data.session_percent.map(usage_level);
            colored(percent(data.session_percent), level, tmux_colors)
        }
        "w" => {
            let level = data
                .week_percent
                .map(|pct| weekly_usage_level(pct, display.week_days_left));
            colored(percent(data.week_percent), level, tmux_colors)
        }
        "sr" => or_missing(display.session_countdown.clone()),
        "wr" => or_missing(display.week_countdown.clone()),
        "wd" => or_missing(display.week_days_left.map(|d| (8 - d).to_string())),
        "wl" => or_missing(display.week_days_left.map(|d| d.to_string())),
        "srt" => or_missing(display.session_reset_date_time.clone()),
        "wrt" => or_missing(display.week_reset_date_time.clone()),
        _ => return None,
    };
    Some(value)
}

fn percent(value: Option<u32>) -> String {
    value
        .map(|pct| format!("{pct}%"))
        .unwrap_or_else(|| MISSING_PERCENT.to_string())
}

fn or_missing(value: Option<String>) -> String {
    value.unwrap_or_else(|| MISSING_VALUE.to_string())
}

/// Wrap in tmux `#[fg=...]` markup for the level's colour
fn colored(text: String, level: Option<UsageLevel>, tmux_colors: bool) -> String {
    match level {
        Some(level) if tmux_colors => {
            format!("#[fg={}]{}#[default]", tmux_colour(level), text)
        }
        _ => text,
    }
}

fn tmux_colour(level: UsageLevel) -> &'static str {
    match level {
        UsageLevel::Low => "green",
        UsageLevel::Moderate => "yellow",
        UsageLevel::High => "red",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data() -> UsageData {
        UsageData {
            session_percent: Some(42),
            week_percent: Some(60),
            session_reset_raw: Some("8pm (UTC)".to_string()),
            week_reset_raw: Some("Feb 25 (UTC)".to_string()),
        }
    }

    fn display() -> UsageDisplay {
        UsageDisplay {
            session_countdown: Some("1h30m".to_string()),
            session_reset_date_time: Some("20:00".to_string()),
            week_days_left: Some(4),
            week_countdown: Some("4/7".to_string()),
            week_reset_date_time: Some("Thu Feb 25".to_string()),
            last_updated_ago: "Updated just now".to_string(),
        }
    }

    fn loaded() -> UsageView {
        UsageView {
            state: UsageState::Loaded(data()),
            display: display(),
            refreshing: false,
        }
    }

    #[test]
    fn test_presets() {
        let view = loaded();
        let render = |style| StatusLine::new(style, None, false).render(&view);

        assert_eq!(render(StatusBarStyle::Session), "42%");
        assert_eq!(render(StatusBarStyle::SessionWeek), "S:42% W:60%");
        assert_eq!(render(StatusBarStyle::Countdowns), "S:42%(1h30m) W:60%(4/7)");
    }

    #[test]
    fn test_missing_values() {
        let view = UsageView {
            state: UsageState::Loaded(UsageData {
                session_percent: Some(10),
                ..Default::default()
            }),
            display: UsageDisplay::default(),
            refreshing: false,
        };
        let line = StatusLine::new(StatusBarStyle::Countdowns, None, false);
        assert_eq!(line.render(&view), "S:10%(?) W:\u{2014}(?)");
    }

    #[test]
    fn test_state_icons() {
        let line = StatusLine::new(StatusBarStyle::Session, None, false);
        let view = |state| UsageView {
            state,
            ..Default::default()
        };

        assert_eq!(line.render(&view(UsageState::Loading("x".into()))), "\u{23F3}");
        assert_eq!(line.render(&view(UsageState::Error("x".into()))), "\u{26A0}\u{FE0F}");
        assert_eq!(line.render(&view(UsageState::NotAuthenticated)), "\u{1F512}");
    }

    #[test]
    fn test_custom_template() {
        let line = StatusLine::new(
            StatusBarStyle::Session,
            Some("{s} until {srt} | week {wd}/7 ({wl}d left, {wrt})"),
            false,
        );
        assert_eq!(
            line.render(&loaded()),
            "42% until 20:00 | week 4/7 (4d left, Thu Feb 25)"
        );
    }

    #[test]
    fn test_unknown_and_unclosed_placeholders() {
        assert_eq!(
            render_template("{x} {s} {", &data(), &display(), false),
            "{x} 42% {"
        );
        assert_eq!(render_template("no braces", &data(), &display(), false), "no braces");
    }

    #[test]
    fn test_tmux_colors() {
        // 60% on day 4 of 7 is slightly ahead of the expected pace
        assert_eq!(
            render_template("{s} {w}", &data(), &display(), true),
            "#[fg=green]42%#[default] #[fg=yellow]60%#[default]"
        );

        let mut heavy = data();
        heavy.session_percent = Some(85);
        assert_eq!(
            render_template("{s}", &heavy, &display(), true),
            "#[fg=red]85%#[default]"
        );

        let mut none = data();
        none.week_percent = None;
        assert_eq!(render_template("{w}", &none, &display(), true), "\u{2014}");
    }
}
