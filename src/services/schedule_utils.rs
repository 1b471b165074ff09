use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

pub const HOURS_EPSILON: f64 = 1e-9;

pub fn local_date(dt: DateTime<Utc>, tz: Tz) -> NaiveDate {
    dt.with_timezone(&tz).date_naive()
}

pub fn local_time(dt: DateTime<Utc>, tz: Tz) -> NaiveTime {
    dt.with_timezone(&tz).time()
}

/// Resolve a local wall-clock time to UTC; DST gaps fall back to the UTC reading.
pub fn at_local(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> AppResult<bool> {
    if a_end <= a_start || b_end <= b_start {
        return Err(AppError::validation("time range is invalid"));
    }
    Ok(a_start < b_end && b_start < a_end)
}

pub fn duration_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_minutes() as f64 / 60.0
}

pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::minutes((hours * 60.0).round() as i64)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
