use crate::error::DateParseError;
use std::fmt;
use std::str::FromStr;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// Julian day number of 1970-01-01.
const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// "YYYY-MM-DD" start of an extraction window, taken as midnight UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StartDate(Date);

impl StartDate {
    pub fn new(date: Date) -> Self {
        Self(date)
    }
    pub fn date(self) -> Date {
        self.0
    }
    /// Unix seconds of midnight UTC on this date.
    pub fn unix_timestamp(self) -> i64 {
        self.0.midnight().assume_utc().unix_timestamp()
    }
}

impl fmt::Display for StartDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.0.year(), self.0.month() as u8, self.0.day())
    }
}

impl FromStr for StartDate {
    type Err = DateParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fmt = format_description!("[year]-[month]-[day]");
        Date::parse(s, &fmt)
            .map(Self)
            .map_err(|source| DateParseError { input: s.to_string(), source })
    }
}

/// Interpret `secs` as Unix seconds (UTC), keeping microsecond precision.
pub fn datetime_from_epoch_seconds(secs: f64) -> Option<PrimitiveDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let micros = (secs * 1e6).round();
    if micros.abs() > i64::MAX as f64 {
        return None;
    }
    datetime_from_epoch_micros(micros as i64)
}

pub fn datetime_from_epoch_micros(micros: i64) -> Option<PrimitiveDateTime> {
    let dt = OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).ok()?;
    Some(PrimitiveDateTime::new(dt.date(), dt.time()))
}

pub fn date_from_epoch_days(days: i32) -> Option<Date> {
    Date::from_julian_day(UNIX_EPOCH_JULIAN_DAY.checked_add(days)?).ok()
}

/// Current wall-clock time in UTC, truncated to microseconds so it survives a
/// round trip through the store unchanged.
pub fn now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    let t = now.time();
    let time = Time::from_hms_micro(t.hour(), t.minute(), t.second(), t.microsecond()).unwrap_or(t);
    PrimitiveDateTime::new(now.date(), time)
}

/// English weekday name, e.g. "Friday".
pub fn weekday_name(date: Date) -> String {
    date.weekday().to_string()
}

/// English month name, e.g. "January".
pub fn month_name(date: Date) -> String {
    date.month().to_string()
}

/// ISO-8601 week number (1..=53).
pub fn iso_week(date: Date) -> u8 {
    date.iso_week()
}

/// "YYYY-MM-DD HH:MM:SS", with a microsecond fraction only when non-zero.
pub fn format_datetime(dt: PrimitiveDateTime) -> String {
    let whole = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let frac = format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");
    let res = if dt.microsecond() == 0 { dt.format(&whole) } else { dt.format(&frac) };
    res.unwrap_or_else(|_| format!("{dt}"))
}

pub fn format_date(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month() as u8, date.day())
}
