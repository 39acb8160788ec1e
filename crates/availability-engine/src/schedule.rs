//! Resolve a provider's effective working hours for a date.
//!
//! Precedence, highest first:
//!
//! 1. An `ABSENCE` exception on the date: unavailable, whatever the weekly
//!    schedule says.
//! 2. A `MODIFIED_HOURS` exception: a single interval replacing the weekly
//!    hours. Its granularity comes from the weekday's base schedule when one
//!    exists, otherwise from the configured default.
//! 3. Every active weekly schedule for the weekday whose validity window
//!    contains the date. Split shifts yield several intervals.
//!
//! Malformed rows are dropped when the resolver is built and reported as
//! [`DataWarning`]s instead of producing nonsense intervals.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::interval::overlaps;
use crate::model::{DataWarning, ExceptionKind, RecordKind, ScheduleException, WorkSchedule};
use crate::time_grid::weekday_index;

/// A contiguous stretch of working time on one date, in minutes since
/// local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingInterval {
    pub start_minutes: u32,
    pub end_minutes: u32,
    pub granularity_minutes: u32,
}

impl WorkingInterval {
    pub fn new(start_minutes: u32, end_minutes: u32, granularity_minutes: u32) -> Self {
        WorkingInterval {
            start_minutes,
            end_minutes,
            granularity_minutes,
        }
    }

    pub fn length_minutes(&self) -> u32 {
        self.end_minutes.saturating_sub(self.start_minutes)
    }
}

impl From<&WorkSchedule> for WorkingInterval {
    fn from(s: &WorkSchedule) -> Self {
        WorkingInterval::new(
            s.start_time.minutes(),
            s.end_time.minutes(),
            s.slot_granularity_minutes,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// An absence exception covers the date.
    Absence,
    /// No exception and no weekly schedule applies.
    NoSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Sorted by start time; never empty.
    Working(Vec<WorkingInterval>),
    Unavailable(UnavailableReason),
}

impl Resolution {
    pub fn intervals(&self) -> &[WorkingInterval] {
        match self {
            Resolution::Working(intervals) => intervals,
            Resolution::Unavailable(_) => &[],
        }
    }
}

/// Indexed, validated view over schedule and exception rows.
#[derive(Debug)]
pub struct ScheduleResolver<'a> {
    schedules: HashMap<&'a str, Vec<&'a WorkSchedule>>,
    exceptions: HashMap<(&'a str, NaiveDate), &'a ScheduleException>,
    default_granularity: u32,
    warnings: Vec<DataWarning>,
}

impl<'a> ScheduleResolver<'a> {
    pub fn new<S, E>(schedules: S, exceptions: E, default_granularity: u32) -> Self
    where
        S: IntoIterator<Item = &'a WorkSchedule>,
        E: IntoIterator<Item = &'a ScheduleException>,
    {
        let mut warnings = Vec::new();

        let mut by_provider: HashMap<&'a str, Vec<&'a WorkSchedule>> = HashMap::new();
        for schedule in schedules {
            if let Some(issue) = schedule.defect() {
                warn!(schedule_id = %schedule.id, %issue, "skipping malformed work schedule");
                warnings.push(DataWarning::new(RecordKind::Schedule, &schedule.id, issue));
                continue;
            }
            by_provider
                .entry(schedule.provider_id.as_str())
                .or_default()
                .push(schedule);
        }
        for rows in by_provider.values_mut() {
            rows.sort_by(|a, b| {
                (a.start_time, a.end_time, &a.id).cmp(&(b.start_time, b.end_time, &b.id))
            });
        }

        let mut by_date: HashMap<(&'a str, NaiveDate), &'a ScheduleException> = HashMap::new();
        for exception in exceptions {
            if let Some(issue) = exception.defect() {
                warn!(exception_id = %exception.id, %issue, "skipping malformed schedule exception");
                warnings.push(DataWarning::new(RecordKind::Exception, &exception.id, issue));
                continue;
            }
            let key = (exception.provider_id.as_str(), exception.date);
            match by_date.get(&key).copied() {
                None => {
                    by_date.insert(key, exception);
                }
                Some(existing) => {
                    let (kept, dropped) = if takes_precedence(exception, existing) {
                        (exception, existing)
                    } else {
                        (existing, exception)
                    };
                    warn!(
                        kept = %kept.id,
                        dropped = %dropped.id,
                        "duplicate schedule exception for provider and date"
                    );
                    warnings.push(DataWarning::new(
                        RecordKind::Exception,
                        &dropped.id,
                        format!(
                            "duplicate exception for {} on {}; {} applies instead",
                            dropped.provider_id, dropped.date, kept.id
                        ),
                    ));
                    by_date.insert(key, kept);
                }
            }
        }

        warnings.sort();
        warnings.dedup();

        ScheduleResolver {
            schedules: by_provider,
            exceptions: by_date,
            default_granularity,
            warnings,
        }
    }

    /// Records dropped while building the resolver.
    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    pub fn exception(&self, provider_id: &str, date: NaiveDate) -> Option<&'a ScheduleException> {
        self.exceptions.get(&(provider_id, date)).copied()
    }

    /// Weekly rows in force for `provider_id` on `date`, sorted by start time.
    fn base_schedules(&self, provider_id: &str, date: NaiveDate) -> impl Iterator<Item = &'a WorkSchedule> + '_ {
        let weekday = weekday_index(date);
        self.schedules
            .get(provider_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |s| s.day_of_week == weekday && s.applies_on(date))
    }

    pub fn resolve(&self, provider_id: &str, date: NaiveDate) -> Resolution {
        if let Some(exception) = self.exception(provider_id, date) {
            match (exception.kind, exception.start_time, exception.end_time) {
                (ExceptionKind::Absence, _, _) => {
                    return Resolution::Unavailable(UnavailableReason::Absence);
                }
                (ExceptionKind::ModifiedHours, Some(start), Some(end)) => {
                    let granularity = self
                        .base_schedules(provider_id, date)
                        .next()
                        .map(|s| s.slot_granularity_minutes)
                        .unwrap_or(self.default_granularity);
                    return Resolution::Working(vec![WorkingInterval::new(
                        start.minutes(),
                        end.minutes(),
                        granularity,
                    )]);
                }
                // Rejected by `defect()` at construction.
                (ExceptionKind::ModifiedHours, _, _) => {}
            }
        }

        let intervals: Vec<WorkingInterval> = self
            .base_schedules(provider_id, date)
            .map(WorkingInterval::from)
            .collect();

        if intervals.is_empty() {
            Resolution::Unavailable(UnavailableReason::NoSchedule)
        } else {
            Resolution::Working(intervals)
        }
    }
}

/// Between two exceptions for the same provider and date, an absence beats
/// modified hours; otherwise the lower id wins so the choice does not depend
/// on the order rows were fetched in.
fn takes_precedence(candidate: &ScheduleException, existing: &ScheduleException) -> bool {
    let rank = |e: &ScheduleException| match e.kind {
        ExceptionKind::Absence => 0,
        ExceptionKind::ModifiedHours => 1,
    };
    (rank(candidate), &candidate.id) < (rank(existing), &existing.id)
}

/// Two weekly rows for the same provider and weekday whose hours and
/// validity windows intersect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleOverlap {
    pub provider_id: String,
    pub day_of_week: u8,
    pub first_id: String,
    pub second_id: String,
}

/// Write-time check: report every pair of a provider's active same-weekday
/// schedules that would double-cover some time. Malformed rows are ignored.
pub fn find_overlapping_schedules(schedules: &[WorkSchedule]) -> Vec<ScheduleOverlap> {
    let usable: Vec<&WorkSchedule> = schedules
        .iter()
        .filter(|s| s.is_active && s.defect().is_none())
        .collect();

    let mut found = Vec::new();
    for (i, a) in usable.iter().enumerate() {
        for b in &usable[i + 1..] {
            if a.provider_id != b.provider_id || a.day_of_week != b.day_of_week {
                continue;
            }
            // Validity bounds are inclusive dates; compare them as [from, until].
            let a_from = a.valid_from.unwrap_or(NaiveDate::MIN);
            let a_until = a.valid_until.unwrap_or(NaiveDate::MAX);
            let b_from = b.valid_from.unwrap_or(NaiveDate::MIN);
            let b_until = b.valid_until.unwrap_or(NaiveDate::MAX);
            let same_period = a_from <= b_until && b_from <= a_until;

            if same_period && overlaps(a.start_time, a.end_time, b.start_time, b.end_time) {
                let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
                found.push(ScheduleOverlap {
                    provider_id: a.provider_id.clone(),
                    day_of_week: a.day_of_week,
                    first_id: first.id.clone(),
                    second_id: second.id.clone(),
                });
            }
        }
    }
    found.sort();
    found
}
