//! Calendar windows for analytics queries.
//!
//! A window is the half-open interval `[start, now)`. Only the lower bound is
//! computed here; the store filters with `created_at >= start`.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Granularity keyword accepted by `GET /api/analytics?period=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Month,
    Quarter,
    Year,
    /// No lower bound. Produced by any unrecognised or absent keyword.
    All,
}

impl Period {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("day") => Self::Day,
            Some("month") => Self::Month,
            Some("quarter") => Self::Quarter,
            Some("year") => Self::Year,
            _ => Self::All,
        }
    }
}

/// Zone in which calendar boundaries are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowTimezone {
    /// The server process's local zone.
    #[default]
    Local,
    Named(Tz),
}

impl WindowTimezone {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        raw.parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| format!("unknown timezone: {raw}"))
    }
}

/// Start of the window for `period`, as of the current wall-clock time.
pub fn resolve_window_start(period: Period, timezone: &WindowTimezone) -> DateTime<Utc> {
    match timezone {
        WindowTimezone::Local => window_start_at(period, &Local::now()),
        WindowTimezone::Named(tz) => window_start_at(period, &Utc::now().with_timezone(tz)),
    }
}

/// Start of the window for `period` relative to `now`, in `now`'s zone.
///
/// Calendar fields are taken from `now` as seen in its own zone, so a day
/// boundary in `America/New_York` is New York midnight, not UTC midnight.
pub fn window_start_at<Z: TimeZone>(period: Period, now: &DateTime<Z>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first_day = match period {
        Period::Day => Some(today),
        Period::Month => today.with_day(1),
        Period::Quarter => NaiveDate::from_ymd_opt(today.year(), today.month0() / 3 * 3 + 1, 1),
        Period::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1),
        Period::All => None,
    };

    match first_day.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(midnight) => local_midnight_to_utc(&now.timezone(), midnight),
        None => DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// Midnight can be skipped by a DST jump; the first valid hour after it is
/// used instead.
fn local_midnight_to_utc<Z: TimeZone>(tz: &Z, midnight: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}
