//! Clock-time strings, minute offsets, and practice-local instants.
//!
//! Everything that maps between a calendar date, a wall-clock time in the
//! practice's timezone, and an absolute UTC instant goes through this module.
//! In particular [`weekday_index`] is the one place a date becomes a
//! Monday=0..Sunday=6 index.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{AvailabilityError, Result};

/// Minutes in a civil day; `24:00` is the largest representable clock time.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Longest DST gap we will walk across when shifting forward. Real-world gaps
/// are 30 or 60 minutes; a few historical zones skipped two hours.
const MAX_GAP_MINUTES: i64 = 180;

/// A wall-clock time of day with minute precision, `00:00` through `24:00`.
///
/// Serialized as an `"HH:MM"` string. `24:00` is only meaningful as the end
/// of a working interval that runs to midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY as u16);

    /// Build from minutes since midnight. Returns `None` past `24:00`.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(ClockTime(minutes as u16))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::from_minutes(hour.checked_mul(60)?.checked_add(minute)?)
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_minutes(self.minutes()))
    }
}

impl FromStr for ClockTime {
    type Err = AvailabilityError;

    /// Accepts `HH:MM`, or `HH:MM:00` as stored by SQL `time` columns.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || AvailabilityError::invalid("clock time", format!("'{}' is not HH:MM", s));

        let mut parts = s.trim().split(':');
        let hour = parts.next().ok_or_else(bad)?;
        let minute = parts.next().ok_or_else(bad)?;
        if let Some(seconds) = parts.next() {
            if seconds != "00" {
                return Err(bad());
            }
        }
        if parts.next().is_some() || hour.len() != 2 || minute.len() != 2 {
            return Err(bad());
        }

        let hour: u32 = hour.parse().map_err(|_| bad())?;
        let minute: u32 = minute.parse().map_err(|_| bad())?;
        ClockTime::from_hm(hour, minute).ok_or_else(bad)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = AvailabilityError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Parse an `HH:MM` string into minutes since midnight.
pub fn parse_clock(s: &str) -> Result<u32> {
    s.parse::<ClockTime>().map(ClockTime::minutes)
}

/// Format minutes since midnight as `HH:MM`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parse a `YYYY-MM-DD` calendar date, reporting failures against `field`.
pub fn parse_date(field: &'static str, s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| AvailabilityError::invalid(field, format!("'{}': {}", s, e)))
}

/// Day-of-week index with Monday = 0 through Sunday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// The practice-local calendar date containing `now`.
pub fn today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Resolve a wall-clock time on `date` in `tz` to a UTC instant.
///
/// `minutes` may be [`MINUTES_PER_DAY`], which lands on the following
/// midnight. Returns `None` only when the local time falls in a DST gap and
/// the policy is [`DstPolicy::Skip`].
pub fn local_instant(date: NaiveDate, minutes: u32, tz: Tz, policy: DstPolicy) -> Option<DateTime<Utc>> {
    let local = date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(minutes));

    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => (1..=MAX_GAP_MINUTES)
                .find_map(|step| tz.from_local_datetime(&(local + Duration::minutes(step))).earliest())
                .map(|dt| dt.with_timezone(&Utc)),
        },
    }
}

/// The first instant of `date` in `tz`.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_instant(date, 0, tz, DstPolicy::ShiftForward)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc())
}

/// Every date from `start` through `end`, inclusive. Empty when `start > end`.
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |d| d.succ_opt()).take_while(move |d| *d <= end)
}
