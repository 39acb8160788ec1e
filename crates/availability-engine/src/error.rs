//! Error types for availability-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::window::WindowRejection;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Unknown appointment type: {0}")]
    UnknownAppointmentType(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A single-date request fell outside the booking window. The computed
    /// bounds travel with the rejection so the caller can display them.
    #[error("{date} is {reason} (bookable from {min_date} to {max_date})")]
    OutsideBookingWindow {
        date: NaiveDate,
        reason: WindowRejection,
        min_date: NaiveDate,
        max_date: NaiveDate,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl AvailabilityError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        AvailabilityError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AvailabilityError>;
