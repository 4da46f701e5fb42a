//! Parsing of the composer's "send at" field
//!
//! Accepted forms:
//! - Relative: `in 5m`, `in 2h`, `in 1d`, `in 30 minutes`, `in 2 hours`
//!   (`+2h` is shorthand for `in 2h`)
//! - Time of day: `15:00`, `3pm`, `9:30am` (today, or tomorrow once passed)
//! - Local date and time: `2030-01-15 15:00`, `2030-01-15T15:00`
//! - RFC 3339: `2030-01-15T15:00:00+03:30`
//!
//! The backend refuses times in the past, so [`parse_future`] checks first.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};

const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const HELP: &str = "try 'in 30m', 'in 2 hours', '15:00', '3pm' or 'YYYY-MM-DD HH:MM'";

/// Parse a schedule string relative to `now`
pub fn parse_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        bail!("schedule time is empty; {HELP}");
    }

    if let Some(rest) = input.strip_prefix("in ").or_else(|| input.strip_prefix('+')) {
        let offset = relative(rest)?;
        return now
            .checked_add_signed(offset)
            .ok_or_else(|| anyhow!("'{rest}' is too far away"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(naive) = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&input, fmt).ok())
    {
        return local_to_utc(naive);
    }

    if let Some(time) = time_of_day(&input) {
        return next_occurrence(time, now);
    }

    Err(anyhow!("could not understand '{input}'; {HELP}"))
}

/// Parse and require a moment strictly after `now`
pub fn parse_future(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let at = parse_at(input, now)?;
    if at <= now {
        bail!("schedule time must be in the future");
    }
    Ok(at)
}

/// Local wall-clock rendering used in lists and the composer preview
pub fn display_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn relative(input: &str) -> Result<Duration> {
    let input = input.trim();

    if let Some(offset) = short_duration(input) {
        return offset;
    }

    let mut words = input.split_whitespace();
    let (Some(amount), Some(unit)) = (words.next(), words.next()) else {
        bail!("could not understand 'in {input}'; {HELP}");
    };
    let amount: i64 = amount
        .parse()
        .map_err(|_| anyhow!("'{amount}' is not a number"))?;

    let offset = match unit.trim_end_matches('s') {
        "second" | "sec" => Duration::try_seconds(amount),
        "minute" | "min" => Duration::try_minutes(amount),
        "hour" | "hr" => Duration::try_hours(amount),
        "day" => Duration::try_days(amount),
        "week" => Duration::try_weeks(amount),
        _ => bail!("unknown time unit '{unit}'"),
    };
    offset.ok_or_else(|| anyhow!("'{input}' is too far away"))
}

/// `30s`, `5m`, `2h`, `1d`, `1w`; `Err` when the amount does not fit a duration
fn short_duration(input: &str) -> Option<Result<Duration>> {
    let unit = input.chars().last()?;
    let amount: i64 = input[..input.len() - unit.len_utf8()].parse().ok()?;

    let offset = match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        _ => return None,
    };
    Some(offset.ok_or_else(|| anyhow!("'{input}' is too far away")))
}

fn time_of_day(input: &str) -> Option<NaiveTime> {
    if let Some(time) = ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(input, fmt).ok())
    {
        return Some(time);
    }

    let compact = input.replace(' ', "");
    let (clock, pm) = if let Some(clock) = compact.strip_suffix("pm") {
        (clock, true)
    } else {
        (compact.strip_suffix("am")?, false)
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None => (clock.parse::<u32>().ok()?, 0),
    };
    if !(1..=12).contains(&hour) {
        return None;
    }

    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Today at `time` in local time, or tomorrow if that has already passed
fn next_occurrence(time: NaiveTime, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let today = now.with_timezone(&Local).date_naive();
    let candidate = local_to_utc(today.and_time(time))?;
    if candidate > now {
        return Ok(candidate);
    }
    local_to_utc((today + Duration::days(1)).and_time(time))
}

fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("{naive} is ambiguous or skipped in the local time zone"))
}
