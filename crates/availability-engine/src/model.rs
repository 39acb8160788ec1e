//! Input records handed to the engine by its caller.
//!
//! The engine never fetches these itself. A caller reads schedules,
//! exceptions, and bookings for the requested providers and dates in a few
//! batched queries and passes them in as an [`AvailabilityInputs`] snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};
use crate::interval::TimeRange;
use crate::time_grid::{ClockTime, MINUTES_PER_DAY};

/// A provider eligible for the requested appointment type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    /// Name shown to patients, e.g. "Dr. Adams".
    pub display_name: String,
}

/// A provider's recurring weekly hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSchedule {
    pub id: String,
    pub provider_id: String,
    /// 0 = Monday through 6 = Sunday, in the practice's local week.
    pub day_of_week: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub slot_granularity_minutes: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    /// Last date (inclusive) this schedule applies. Superseded schedules are
    /// closed off here rather than deleted.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl WorkSchedule {
    /// Whether this row is in force on `date` (ignores the weekday).
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.valid_from.is_none_or(|from| from <= date)
            && self.valid_until.is_none_or(|until| date <= until)
    }

    /// Describe why the row cannot be used, if it is malformed.
    pub(crate) fn defect(&self) -> Option<String> {
        if self.day_of_week > 6 {
            return Some(format!("day_of_week {} is outside 0..=6", self.day_of_week));
        }
        if self.start_time >= self.end_time {
            return Some(format!(
                "start_time {} is not before end_time {}",
                self.start_time, self.end_time
            ));
        }
        if self.slot_granularity_minutes == 0 {
            return Some("slot_granularity_minutes must be positive".to_string());
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                return Some(format!("valid_from {} is after valid_until {}", from, until));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionKind {
    /// Provider is unavailable for the whole date.
    Absence,
    /// Provider works `start_time..end_time` instead of the recurring hours.
    ModifiedHours,
}

/// A one-off override of a provider's hours on a specific date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleException {
    pub id: String,
    pub provider_id: String,
    pub date: NaiveDate,
    pub kind: ExceptionKind,
    #[serde(default)]
    pub start_time: Option<ClockTime>,
    #[serde(default)]
    pub end_time: Option<ClockTime>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ScheduleException {
    pub(crate) fn defect(&self) -> Option<String> {
        match (self.kind, self.start_time, self.end_time) {
            (ExceptionKind::Absence, _, _) => None,
            (ExceptionKind::ModifiedHours, Some(start), Some(end)) if start < end => None,
            (ExceptionKind::ModifiedHours, Some(start), Some(end)) => Some(format!(
                "modified hours start_time {} is not before end_time {}",
                start, end
            )),
            (ExceptionKind::ModifiedHours, _, _) => {
                Some("modified hours exception is missing start_time or end_time".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    /// Any status this engine does not know about. Treated as occupying time.
    #[serde(other)]
    Other,
}

impl BookingStatus {
    /// Cancelled and no-show bookings free their time; everything else holds it.
    pub fn blocks_time(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::NoShow)
    }
}

/// An existing reservation of provider time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    /// Provider whose time is held.
    pub provider_id: String,
    pub start: DateTime<Utc>,
    /// Exclusive. A slot starting exactly here is free.
    pub end: DateTime<Utc>,
    /// Only statuses for which [`BookingStatus::blocks_time`] holds remove slots.
    pub status: BookingStatus,
}

impl Booking {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// How long the requested appointment is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSpec {
    /// Look the duration up in the [`AppointmentCatalog`].
    AppointmentType(String),
    /// Explicit override in minutes.
    Minutes(u32),
}

/// Appointment type id → duration in minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentCatalog(BTreeMap<String, u32>);

impl AppointmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, type_id: impl Into<String>, minutes: u32) -> Self {
        self.0.insert(type_id.into(), minutes);
        self
    }

    pub fn get(&self, type_id: &str) -> Option<u32> {
        self.0.get(type_id).copied()
    }

    /// Resolve a [`DurationSpec`] to a validated, positive number of minutes.
    pub fn resolve(&self, spec: &DurationSpec) -> Result<u32> {
        let minutes = match spec {
            DurationSpec::Minutes(m) => *m,
            DurationSpec::AppointmentType(type_id) => self
                .get(type_id)
                .ok_or_else(|| AvailabilityError::UnknownAppointmentType(type_id.clone()))?,
        };
        if minutes == 0 {
            return Err(AvailabilityError::invalid(
                "duration_minutes",
                "must be positive",
            ));
        }
        if minutes > MINUTES_PER_DAY {
            return Err(AvailabilityError::invalid(
                "duration_minutes",
                format!("{} exceeds one day", minutes),
            ));
        }
        Ok(minutes)
    }
}

impl FromIterator<(String, u32)> for AppointmentCatalog {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        AppointmentCatalog(iter.into_iter().collect())
    }
}

/// Everything the engine needs for one request, pre-fetched by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityInputs {
    pub providers: Vec<Provider>,
    pub schedules: Vec<WorkSchedule>,
    pub exceptions: Vec<ScheduleException>,
    pub bookings: Vec<Booking>,
    pub appointment_types: AppointmentCatalog,
}

impl AvailabilityInputs {
    pub fn provider(&self, provider_id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == provider_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Schedule,
    Exception,
    Booking,
}

/// A record the engine skipped because it was internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataWarning {
    pub kind: RecordKind,
    pub record_id: String,
    pub issue: String,
}

impl DataWarning {
    pub(crate) fn new(kind: RecordKind, record_id: &str, issue: impl Into<String>) -> Self {
        DataWarning {
            kind,
            record_id: record_id.to_string(),
            issue: issue.into(),
        }
    }
}
