//! Candidate slots within a working interval.
//!
//! [`generate`] is the pure minute-offset enumeration. [`candidates`] anchors
//! those offsets to a date in the practice timezone, producing
//! [`CandidateSlot`]s with absolute instants.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::interval::TimeRange;
use crate::schedule::WorkingInterval;
use crate::time_grid::{self, format_minutes, MINUTES_PER_DAY};

/// One bookable slot for one provider on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub provider_id: String,
    pub date: NaiveDate,
    /// Local wall-clock start, minutes since midnight.
    pub start_minutes: u32,
    pub end_minutes: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CandidateSlot {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    /// `HH:MM` local start.
    pub fn start_time(&self) -> String {
        format_minutes(self.start_minutes)
    }

    /// `HH:MM` local end.
    pub fn end_time(&self) -> String {
        format_minutes(self.end_minutes)
    }
}

/// Start offsets (minutes since midnight) of every slot of `duration_minutes`
/// that fits entirely inside `interval`, stepping by its granularity.
///
/// The iterator is `Clone`, so a caller can restart the enumeration cheaply.
/// A duration longer than the interval yields nothing.
pub fn generate(interval: &WorkingInterval, duration_minutes: u32) -> SlotStarts {
    SlotStarts {
        next: interval.start_minutes,
        last_start: interval.end_minutes.checked_sub(duration_minutes),
        step: interval.granularity_minutes,
    }
}

/// Anchor every generated start in `interval` to `date` in `tz`.
///
/// A start inside a DST gap is dropped under [`DstPolicy::Skip`]. Under
/// [`DstPolicy::ShiftForward`] it is relabelled with the wall-clock time it
/// actually lands on. Either way a slot is kept only if its real end is no
/// later than the real end of the interval, so a slot never outlasts the
/// provider's hours on a night the clocks change. Starts that collapse onto
/// the same instant are kept once.
pub fn candidates(
    provider_id: &str,
    date: NaiveDate,
    interval: &WorkingInterval,
    duration_minutes: u32,
    tz: Tz,
    dst_policy: DstPolicy,
) -> Vec<CandidateSlot> {
    let length = Duration::minutes(i64::from(duration_minutes));
    // An interval ending inside a gap ends where the gap ends.
    let Some(interval_end) =
        time_grid::local_instant(date, interval.end_minutes, tz, DstPolicy::ShiftForward)
    else {
        return Vec::new();
    };
    let mut out: Vec<CandidateSlot> = Vec::with_capacity(generate(interval, duration_minutes).len());

    for offset in generate(interval, duration_minutes) {
        let Some(start) = time_grid::local_instant(date, offset, tz, dst_policy) else {
            continue;
        };
        let end = start + length;
        if end > interval_end {
            continue;
        }
        let local_start = start.with_timezone(&tz);
        if local_start.date_naive() != date {
            continue;
        }
        let start_minutes = local_start.time().num_seconds_from_midnight() / 60;
        let end_minutes = end_label(end, date, tz);
        if out.last().is_some_and(|prev| prev.start == start) {
            continue;
        }
        out.push(CandidateSlot {
            provider_id: provider_id.to_string(),
            date,
            start_minutes,
            end_minutes,
            start,
            end,
        });
    }
    out
}

/// Wall-clock minutes of a slot end. An end past `date` reads as `24:00`.
fn end_label(end: DateTime<Utc>, date: NaiveDate, tz: Tz) -> u32 {
    let local = end.with_timezone(&tz);
    if local.date_naive() == date {
        local.time().num_seconds_from_midnight() / 60
    } else {
        MINUTES_PER_DAY
    }
}

#[derive(Debug, Clone)]
pub struct SlotStarts {
    next: u32,
    /// Latest start that still fits; `None` if nothing can.
    last_start: Option<u32>,
    step: u32,
}

impl Iterator for SlotStarts {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let last_start = self.last_start?;
        if self.step == 0 || self.next > last_start {
            return None;
        }
        let start = self.next;
        match start.checked_add(self.step) {
            Some(next) => self.next = next,
            None => self.last_start = None,
        }
        Some(start)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.last_start {
            Some(last) if self.step > 0 && self.next <= last => ((last - self.next) / self.step + 1) as usize,
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlotStarts {}
