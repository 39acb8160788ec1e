//! Practice-level configuration.
//!
//! [`PracticeSettings`] is the document as stored (every field optional, with
//! defaults). [`EngineConfig::from_settings`] validates it once at load time;
//! the rest of the engine only ever sees a validated [`EngineConfig`].

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dst::DstPolicy;
use crate::error::{AvailabilityError, Result};

pub const DEFAULT_MIN_NOTICE_DAYS: u32 = 1;
pub const DEFAULT_MAX_ADVANCE_DAYS: u32 = 90;
pub const DEFAULT_GRANULARITY_MINUTES: u32 = 15;

/// How soon and how far ahead patients may book, in whole days from today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingWindowPolicy {
    pub min_notice_days: u32,
    pub max_advance_days: u32,
}

impl Default for BookingWindowPolicy {
    fn default() -> Self {
        BookingWindowPolicy {
            min_notice_days: DEFAULT_MIN_NOTICE_DAYS,
            max_advance_days: DEFAULT_MAX_ADVANCE_DAYS,
        }
    }
}

impl BookingWindowPolicy {
    pub fn new(min_notice_days: u32, max_advance_days: u32) -> Result<Self> {
        let policy = BookingWindowPolicy {
            min_notice_days,
            max_advance_days,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_advance_days < self.min_notice_days {
            return Err(AvailabilityError::InvalidConfig(format!(
                "max_advance_days ({}) must be >= min_notice_days ({})",
                self.max_advance_days, self.min_notice_days
            )));
        }
        Ok(())
    }
}

/// Settings document as persisted by the practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeSettings {
    /// IANA timezone name used for the practice's local week and clock times.
    pub timezone: String,
    pub booking_window: BookingWindowPolicy,
    /// Step used for modified-hours exceptions when the provider has no
    /// recurring schedule on that weekday to inherit from.
    pub default_granularity_minutes: u32,
    pub dst_policy: DstPolicy,
    /// Size of a dedicated worker pool for range queries. `None` uses the
    /// process-wide rayon pool.
    pub worker_threads: Option<usize>,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        PracticeSettings {
            timezone: "UTC".to_string(),
            booking_window: BookingWindowPolicy::default(),
            default_granularity_minutes: DEFAULT_GRANULARITY_MINUTES,
            dst_policy: DstPolicy::default(),
            worker_threads: None,
        }
    }
}

/// Validated engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub timezone: Tz,
    pub booking_window: BookingWindowPolicy,
    pub default_granularity_minutes: u32,
    pub dst_policy: DstPolicy,
    pub worker_threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            timezone: Tz::UTC,
            booking_window: BookingWindowPolicy::default(),
            default_granularity_minutes: DEFAULT_GRANULARITY_MINUTES,
            dst_policy: DstPolicy::default(),
            worker_threads: None,
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: PracticeSettings) -> Result<Self> {
        let timezone: Tz = settings
            .timezone
            .parse()
            .map_err(|_| AvailabilityError::InvalidTimezone(settings.timezone.clone()))?;

        settings.booking_window.validate()?;

        if settings.default_granularity_minutes == 0 {
            return Err(AvailabilityError::InvalidConfig(
                "default_granularity_minutes must be positive".to_string(),
            ));
        }
        if settings.worker_threads == Some(0) {
            return Err(AvailabilityError::InvalidConfig(
                "worker_threads must be positive when set".to_string(),
            ));
        }

        debug!(
            timezone = %timezone,
            min_notice_days = settings.booking_window.min_notice_days,
            max_advance_days = settings.booking_window.max_advance_days,
            "loaded practice settings"
        );

        Ok(EngineConfig {
            timezone,
            booking_window: settings.booking_window,
            default_granularity_minutes: settings.default_granularity_minutes,
            dst_policy: settings.dst_policy,
            worker_threads: settings.worker_threads,
        })
    }

    /// Parse and validate a JSON settings document. Missing fields take their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: PracticeSettings = serde_json::from_str(json)
            .map_err(|e| AvailabilityError::InvalidConfig(e.to_string()))?;
        Self::from_settings(settings)
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_booking_window(mut self, policy: BookingWindowPolicy) -> Self {
        self.booking_window = policy;
        self
    }
}
