//! Turn raw "Resets ..." descriptions into countdowns and reset dates.
//!
//! Session resets look like `8pm (Europe/Warsaw)` or `8:30pm (UTC)`, weekly
//! resets like `Feb 25 at 7am (Europe/Warsaw)`. The parenthesized zone is
//! optional; without it (or when it is unknown) the local zone is used.

use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

static ZONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("Invalid ZONE_PATTERN regex"));

static TRAILING_ZONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*?\)\s*$").expect("Invalid TRAILING_ZONE_PATTERN regex"));

static CLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2})(?::(\d{2}))?\s*(am|pm)").expect("Invalid CLOCK_PATTERN regex")
});

static MONTH_DAY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][a-z]{2})\s+(\d{1,2})").expect("Invalid MONTH_DAY_PATTERN regex")
});

/// Length of the weekly cycle in days
const WEEK_DAYS: i64 = 7;

/// Longest daylight-saving gap skipped when resolving a wall-clock time
const MAX_GAP_HOURS: i64 = 2;

/// Countdown until the next session reset, e.g. "2h05m", "3h" or "45m"
pub fn time_until_session_reset(raw: &str) -> Option<String> {
    time_until_session_reset_at(raw, Utc::now())
}

/// [`time_until_session_reset`] relative to a fixed `now`
pub fn time_until_session_reset_at(raw: &str, now: DateTime<Utc>) -> Option<String> {
    next_session_reset(raw, now).map(|reset| format_countdown(reset - now))
}

/// Next instant strictly after `now` matching the reset time of day.
///
/// "Today" is taken in the reset's zone; a time already passed rolls over to
/// the same wall-clock time tomorrow.
pub fn next_session_reset(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let time = parse_clock(&strip_zone(raw))?;
    match parse_zone(raw) {
        Some(zone) => next_occurrence(&zone, now, time),
        None => next_occurrence(&Local, now, time),
    }
}

/// Format a positive duration as "<h>h<mm>m", "<h>h" or "<m>m"
pub fn format_countdown(remaining: Duration) -> String {
    let total_minutes = remaining.num_seconds().max(0) / 60;
    if total_minutes >= 60 {
        let hours = total_minutes / 60;
        let minutes = total_minutes % 60;
        if minutes > 0 {
            format!("{}h{:02}m", hours, minutes)
        } else {
            format!("{}h", hours)
        }
    } else {
        format!("{}m", total_minutes)
    }
}

/// Local wall-clock time of the next session reset, e.g. "20:00"
pub fn session_reset_date_time(raw: &str, now: DateTime<Utc>) -> Option<String> {
    next_session_reset(raw, now)
        .map(|reset| reset.with_timezone(&Local).format("%H:%M").to_string())
}

/// Calendar date of the weekly reset.
///
/// The "<Mon> <day>" token gets the current year; a date before `today`
/// moves to the following year (once).
pub fn week_reset_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (month, day) = parse_month_day(&strip_zone(raw))?;
    match NaiveDate::from_ymd_opt(today.year(), month, day) {
        Some(date) if date >= today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

/// Whole days from today (local) until the weekly reset
pub fn days_left_until_reset(raw: &str) -> Option<i64> {
    days_left_until_reset_from(raw, Local::now().date_naive())
}

/// [`days_left_until_reset`] relative to a fixed `today`
pub fn days_left_until_reset_from(raw: &str, today: NaiveDate) -> Option<i64> {
    week_reset_date(raw, today).map(|date| (date - today).num_days())
}

/// Position in the weekly cycle: 7 days left is "1/7", 1 day left is "7/7".
///
/// Zero days left yields "8/7"; callers must cope with the overflow label.
pub fn week_day_label(days_left: i64) -> String {
    format!("{}/{}", WEEK_DAYS + 1 - days_left, WEEK_DAYS)
}

/// Display form of the weekly reset: "Thu Feb 25", plus " 07:00" in local
/// time when the raw string names both a time and a known zone
pub fn week_reset_date_time(raw: &str, today: NaiveDate) -> Option<String> {
    let date = week_reset_date(raw, today)?;

    let clean = strip_zone(raw);
    if let (Some(time), Some(zone)) = (parse_clock(&clean), parse_zone(raw)) {
        if let Some(reset) = resolve(&zone, date.and_time(time)) {
            return Some(
                reset
                    .with_timezone(&Local)
                    .format("%a %b %-d %H:%M")
                    .to_string(),
            );
        }
    }

    Some(date.format("%a %b %-d").to_string())
}

fn next_occurrence<Z: TimeZone>(
    zone: &Z,
    now: DateTime<Utc>,
    time: NaiveTime,
) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(zone).date_naive();
    let candidate = resolve(zone, today.and_time(time))?;
    if candidate > now {
        return Some(candidate);
    }
    resolve(zone, today.succ_opt()?.and_time(time))
}

/// Local wall-clock time to an instant. A time inside a DST gap moves
/// forward hour by hour until it exists.
fn resolve<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    (0..=MAX_GAP_HOURS).find_map(|shift| {
        zone.from_local_datetime(&(naive + Duration::hours(shift)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn parse_zone(raw: &str) -> Option<Tz> {
    let caps = ZONE_PATTERN.captures(raw)?;
    caps[1].trim().parse::<Tz>().ok()
}

fn strip_zone(raw: &str) -> String {
    TRAILING_ZONE_PATTERN.replace(raw, "").trim().to_string()
}

/// "8pm" / "8:30 PM" to a 24-hour time of day
fn parse_clock(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK_PATTERN.captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let pm = caps[3].eq_ignore_ascii_case("pm");

    if pm && hour != 12 {
        hour += 12;
    } else if !pm && hour == 12 {
        hour = 0;
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_month_day(text: &str) -> Option<(u32, u32)> {
    let caps = MONTH_DAY_PATTERN.captures(text)?;
    let month = match &caps[1] {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    let day = caps[2].parse().ok()?;
    Some((month, day))
}
