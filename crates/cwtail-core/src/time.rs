//! Start/end time expressions.
//!
//! Accepted forms, interpreted in UTC unless the local flag is set:
//!
//! | Form                  | Meaning                                   |
//! |-----------------------|-------------------------------------------|
//! | `2017-02-27`          | midnight of that day                      |
//! | `2017-02-27T09`       | that day at 09:00                         |
//! | `2017-02-27T09:30`    | that day at 09:30                         |
//! | `2017-02-27T09:30:15` | exact date/time                           |
//! | `9`, `09`             | today at 09:00                            |
//! | `09:30`               | today at 09:30                            |
//! | `80m`, `4h`, `4h30m`  | that long before now, truncated to minute |
//! | `now`                 | now                                       |

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use regex::Regex;

use crate::error::TimeParseError;

/// Format used to display event timestamps and accepted as the full input form.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static DATE: LazyLock<Regex> = LazyLock::new(|| re(r"^\d{4}-\d{2}-\d{2}$"));
static DATE_HOUR: LazyLock<Regex> = LazyLock::new(|| re(r"^(\d{4}-\d{2}-\d{2})T(\d{2})$"));
static DATE_HOUR_MIN: LazyLock<Regex> = LazyLock::new(|| re(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}$"));
static HOUR: LazyLock<Regex> = LazyLock::new(|| re(r"^(\d{1,2})$"));
static HOUR_MIN: LazyLock<Regex> = LazyLock::new(|| re(r"^(\d{1,2}):(\d{2})$"));
static RELATIVE: LazyLock<Regex> = LazyLock::new(|| re(r"^(?:(\d+)h)?(?:(\d+)m)?$"));

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

/// Parse a time expression relative to `now`.
pub fn parse_time(
    expr: &str,
    local: bool,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimeParseError> {
    let parsed = if local {
        parse_in(&Local, expr.trim(), now)
    } else {
        parse_in(&Utc, expr.trim(), now)
    };
    parsed.ok_or_else(|| TimeParseError {
        input: expr.to_string(),
    })
}

fn parse_in<Tz: TimeZone>(tz: &Tz, expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if expr.eq_ignore_ascii_case("now") {
        return Some(now);
    }
    let today = now.with_timezone(tz).date_naive();

    let naive = if DATE.is_match(expr) {
        NaiveDate::parse_from_str(expr, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
    } else if let Some(caps) = DATE_HOUR.captures(expr) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        date.and_hms_opt(caps[2].parse().ok()?, 0, 0)?
    } else if DATE_HOUR_MIN.is_match(expr) {
        NaiveDateTime::parse_from_str(expr, "%Y-%m-%dT%H:%M").ok()?
    } else if let Some(caps) = HOUR.captures(expr) {
        today.and_hms_opt(caps[1].parse().ok()?, 0, 0)?
    } else if let Some(caps) = HOUR_MIN.captures(expr) {
        today.and_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)?
    } else if let Some(caps) = RELATIVE.captures(expr).filter(|_| !expr.is_empty()) {
        let hours: i64 = caps.get(1).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let minutes: i64 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let then = now
            .checked_sub_signed(Duration::try_hours(hours)?)?
            .checked_sub_signed(Duration::try_minutes(minutes)?)?;
        return then.with_second(0)?.with_nanosecond(0);
    } else {
        NaiveDateTime::parse_from_str(expr, TIME_FORMAT).ok()?
    };

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Default start time: thirty seconds before `now`.
pub fn default_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::seconds(30)
}
