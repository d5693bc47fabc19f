//! Parse the Claude Code `/usage` screen from captured tmux pane lines.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Section, UsageData};

/// "42% used" on a meter line
static PERCENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)%\s*used").expect("Invalid PERCENT_PATTERN regex"));

/// "Resets 8pm (Europe/Warsaw)" below a meter
static RESET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Resets\s+(.+?)$").expect("Invalid RESET_PATTERN regex"));

/// Lines above a percentage that are searched for its section label
const CONTEXT_LINES: usize = 3;

/// Lowercase markers of the Claude Code login / auth screens
const LOGIN_MARKERS: &[&str] = &[
    "select login method",
    "run /login",
    "not logged in",
    "invalid api key",
    "log in to",
    "login with",
];

/// Whether the capture shows the usage overlay.
///
/// Requires a "% used" meter and a session or week label somewhere on screen.
pub fn is_usage_screen<S: AsRef<str>>(lines: &[S]) -> bool {
    let text = join(lines);
    if !text.contains("% used") {
        return false;
    }
    let lower = text.to_lowercase();
    lower.contains("session") || lower.contains("week")
}

/// Whether the capture shows a login / authentication prompt
pub fn is_login_screen<S: AsRef<str>>(lines: &[S]) -> bool {
    let lower = join(lines).to_lowercase();
    LOGIN_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Parse usage percentages and reset descriptions from a capture.
///
/// Each "N% used" is assigned to a section by looking for "session" or "week"
/// in the line itself and the [`CONTEXT_LINES`] lines above it. A "Resets ..."
/// line belongs to the most recently opened section. For both, the first
/// match per section wins.
///
/// Returns `None` when no percentage could be attributed to a section.
pub fn parse_usage_screen<S: AsRef<str>>(lines: &[S]) -> Option<UsageData> {
    let mut data = UsageData::default();
    let mut section_order: Vec<Section> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();

        if let Some(caps) = PERCENT_PATTERN.captures(line) {
            let Ok(percent) = caps[1].parse::<u32>() else {
                continue;
            };
            let context = join(&lines[i.saturating_sub(CONTEXT_LINES)..=i]).to_lowercase();

            let section = if context.contains("session") && data.session_percent.is_none() {
                Some(Section::Session)
            } else if context.contains("week") && data.week_percent.is_none() {
                Some(Section::Week)
            } else {
                None
            };

            if let Some(section) = section {
                *data.percent_mut(section) = Some(percent);
                section_order.push(section);
            }
            continue;
        }

        let Some(&current) = section_order.last() else {
            continue;
        };
        if let Some(caps) = RESET_PATTERN.captures(line.trim()) {
            let slot = data.reset_raw_mut(current);
            if slot.is_none() {
                *slot = Some(caps[1].trim().to_string());
            }
        }
    }

    data.has_percentages().then_some(data)
}

fn join<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EMPTY: &[&str] = &[];

    #[test]
    fn test_is_usage_screen() {
        assert!(is_usage_screen(&[
            "Session usage",
            "42% used",
            "Resets 8pm (Europe/Warsaw)"
        ]));
        assert!(is_usage_screen(&[
            "Weekly usage",
            "60% used",
            "Resets Feb 25 at 7am (Europe/Warsaw)"
        ]));
        assert!(is_usage_screen(&["Session: 42% used", "Week: 60% used"]));
    }

    #[test]
    fn test_is_usage_screen_rejects_other_content() {
        assert!(!is_usage_screen(EMPTY));
        assert!(!is_usage_screen(&["Hello world", "Some random text"]));
        // has % but not "used"
        assert!(!is_usage_screen(&["Session 50% complete"]));
        // "% used" without a section label
        assert!(!is_usage_screen(&["Extra usage", "44% used"]));
    }

    #[test]
    fn test_is_login_screen() {
        assert!(is_login_screen(&[
            " Claude Code can be used with your Claude subscription",
            " Select login method:",
            " ❯ 1. Claude account with subscription",
        ]));
        assert!(is_login_screen(&["Invalid API key · Please run /login"]));
        assert!(!is_login_screen(&["Session usage", "42% used"]));
        assert!(!is_login_screen(EMPTY));
    }

    #[test]
    fn test_parse_full_session_and_week() {
        let lines = [
            "Session usage",
            "42% used",
            "Resets 8pm (Europe/Warsaw)",
            "",
            "Weekly usage",
            "60% used",
            "Resets Feb 25 at 7am (Europe/Warsaw)",
        ];
        assert_eq!(
            parse_usage_screen(&lines),
            Some(UsageData {
                session_percent: Some(42),
                week_percent: Some(60),
                session_reset_raw: Some("8pm (Europe/Warsaw)".to_string()),
                week_reset_raw: Some("Feb 25 at 7am (Europe/Warsaw)".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_real_overlay() {
        let text = r#"
 Settings:  Status   Config   Usage  (←/→ or tab to cycle)


  Current session
  ████████████████████████████████████               72% used
  Resets 1am (Asia/Tokyo)

  Current week (all models)
  ███████████▌                                       23% used
  Resets Mar 3, 12am (Asia/Tokyo)

  Current week (Sonnet only)
                                                     0% used

  Extra usage
  ██████████████████████▏                            44% used
  $22.22 / $50.00 spent · Resets Mar 1 (Asia/Tokyo)

  Esc to cancel
"#;
        let lines: Vec<&str> = text.lines().collect();
        assert!(is_usage_screen(&lines));

        let data = parse_usage_screen(&lines).expect("should parse");
        assert_eq!(data.session_percent, Some(72));
        assert_eq!(data.week_percent, Some(23));
        assert_eq!(data.session_reset_raw.as_deref(), Some("1am (Asia/Tokyo)"));
        assert_eq!(
            data.week_reset_raw.as_deref(),
            Some("Mar 3, 12am (Asia/Tokyo)")
        );
    }

    #[test]
    fn test_parse_session_only() {
        let data =
            parse_usage_screen(&["Session usage", "75% used", "Resets 10pm (UTC)"]).unwrap();
        assert_eq!(data.session_percent, Some(75));
        assert_eq!(data.week_percent, None);
        assert_eq!(data.session_reset_raw.as_deref(), Some("10pm (UTC)"));
    }

    #[test]
    fn test_parse_week_only() {
        let data = parse_usage_screen(&[
            "Weekly usage",
            "30% used",
            "Resets Mar 1 at 9am (US/Pacific)",
        ])
        .unwrap();
        assert_eq!(data.week_percent, Some(30));
        assert_eq!(data.session_percent, None);
        assert_eq!(
            data.week_reset_raw.as_deref(),
            Some("Mar 1 at 9am (US/Pacific)")
        );
    }

    #[test]
    fn test_parse_uses_context_lines() {
        let data = parse_usage_screen(&["Your session limit", "is shown below:", "", "88% used"])
            .unwrap();
        assert_eq!(data.session_percent, Some(88));
    }

    #[test]
    fn test_parse_context_window_is_bounded() {
        // "session" is four lines above the percentage: out of range
        let lines = ["Session", "a", "b", "c", "88% used"];
        assert_eq!(parse_usage_screen(&lines), None);
    }

    #[test]
    fn test_parse_first_match_wins() {
        let lines = [
            "Session usage",
            "42% used",
            "Resets 8pm (UTC)",
            "Session summary 99% used",
            "Resets 9pm (UTC)",
        ];
        let data = parse_usage_screen(&lines).unwrap();
        assert_eq!(data.session_percent, Some(42));
        assert_eq!(data.session_reset_raw.as_deref(), Some("8pm (UTC)"));
    }

    #[test]
    fn test_parse_reset_before_any_section_is_ignored() {
        let lines = ["Resets 8pm (UTC)", "Weekly usage", "10% used"];
        let data = parse_usage_screen(&lines).unwrap();
        assert_eq!(data.week_percent, Some(10));
        assert_eq!(data.session_reset_raw, None);
        assert_eq!(data.week_reset_raw, None);
    }

    #[test]
    fn test_parse_over_100_percent() {
        let data = parse_usage_screen(&["Current session", "104% used"]).unwrap();
        assert_eq!(data.session_percent, Some(104));
    }

    #[test]
    fn test_parse_returns_none_without_data() {
        assert_eq!(parse_usage_screen(EMPTY), None);
        assert_eq!(parse_usage_screen(&["hello", "world", "no data here"]), None);
        // percentage with no section label nearby is skipped
        assert_eq!(parse_usage_screen(&["Extra usage", "44% used"]), None);
    }
}
