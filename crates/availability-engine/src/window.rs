//! Booking window validation and range clamping.
//!
//! The bookable dates are `today + min_notice_days ..= today + max_advance_days`.
//! A single-date request outside that span is rejected outright; a range
//! request is clamped to it.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::BookingWindowPolicy;
use crate::error::{AvailabilityError, Result};
use crate::time_grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowRejection {
    TooSoon,
    TooFarOut,
}

impl fmt::Display for WindowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowRejection::TooSoon => f.write_str("too soon"),
            WindowRejection::TooFarOut => f.write_str("too far out"),
        }
    }
}

/// The concrete bookable date span for one `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow {
    pub today: NaiveDate,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

impl BookingWindow {
    pub fn new(policy: &BookingWindowPolicy, today: NaiveDate) -> Self {
        let offset = |days: u32| {
            today
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MAX)
        };
        BookingWindow {
            today,
            min_date: offset(policy.min_notice_days),
            max_date: offset(policy.max_advance_days),
        }
    }

    pub fn check(&self, date: NaiveDate) -> std::result::Result<(), WindowRejection> {
        if date < self.min_date {
            Err(WindowRejection::TooSoon)
        } else if date > self.max_date {
            Err(WindowRejection::TooFarOut)
        } else {
            Ok(())
        }
    }

    /// Like [`check`](Self::check), but as an engine error carrying the bounds.
    pub fn validate(&self, date: NaiveDate) -> Result<()> {
        self.check(date)
            .map_err(|reason| AvailabilityError::OutsideBookingWindow {
                date,
                reason,
                min_date: self.min_date,
                max_date: self.max_date,
            })
    }

    /// Intersect `start..=end` with the window.
    pub fn clamp(&self, start: NaiveDate, end: NaiveDate) -> ClampedRange {
        ClampedRange {
            requested_start: start,
            requested_end: end,
            start: start.max(self.min_date),
            end: end.min(self.max_date),
        }
    }

    /// Earliest instant a slot may start: never in the past, and never before
    /// the first bookable day begins in the practice timezone.
    pub fn notice_cutoff(&self, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        now.max(time_grid::start_of_day(self.min_date, tz))
    }
}

/// `validate(requestedDate, policy, today)` as a free function.
pub fn validate(requested: NaiveDate, policy: &BookingWindowPolicy, today: NaiveDate) -> Result<()> {
    BookingWindow::new(policy, today).validate(requested)
}

/// A requested date range after clamping to the booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampedRange {
    pub requested_start: NaiveDate,
    pub requested_end: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ClampedRange {
    /// No requested date survived clamping.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Part of the requested range was dropped.
    pub fn was_clamped(&self) -> bool {
        self.start != self.requested_start || self.end != self.requested_end
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        time_grid::dates_between(self.start, self.end)
    }
}
