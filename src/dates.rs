//! Date helpers for the filter bar and the license table.
//!
//! All functions are pure and tolerate missing input. Dates are taken in
//! the host's local time zone; nothing is normalized beyond that.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};

/// Length of the default filter window.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Wire format of filter dates.
pub const FILTER_DATE_FORMAT: &str = "%Y-%m-%d";

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn from_param(&self) -> String {
        self.from.format(FILTER_DATE_FORMAT).to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format(FILTER_DATE_FORMAT).to_string()
    }
}

/// `[today - 30 days, today]`.
pub fn default_range(today: NaiveDate) -> DateRange {
    DateRange {
        from: today - Duration::days(DEFAULT_RANGE_DAYS),
        to: today,
    }
}

/// [`default_range`] anchored on the host's current local date.
pub fn default_range_now() -> DateRange {
    default_range(Local::now().date_naive())
}

/// Parse the date shapes the license API emits.
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, FILTER_DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Human-readable date, e.g. `Jan 31, 2025`.
///
/// Missing input renders as an empty string; input that does not parse is
/// shown unchanged.
pub fn format_date(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some(raw) => match parse_date_time(raw) {
            Some(dt) => dt.format("%b %-d, %Y").to_string(),
            None => raw.to_string(),
        },
    }
}

/// Whole days between two dates: the ceiling of the absolute difference.
pub fn duration_days(a: Option<&str>, b: Option<&str>) -> Option<i64> {
    let a = parse_date_time(a?)?;
    let b = parse_date_time(b?)?;
    Some(ceil_days(b - a))
}

fn ceil_days(delta: Duration) -> i64 {
    let secs = delta.num_seconds().abs();
    let days = secs / SECONDS_PER_DAY;
    if secs % SECONDS_PER_DAY == 0 {
        days
    } else {
        days + 1
    }
}

/// Render a seconds counter as `1h 02m 03s`. Non-numeric values pass
/// through untouched.
pub fn format_elapsed(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return String::new();
    };
    let Ok(total) = raw.trim().parse::<u64>() else {
        return raw.to_string();
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
