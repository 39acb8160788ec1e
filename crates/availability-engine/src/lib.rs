//! # availability-engine
//!
//! Deterministic appointment availability for practice booking screens.
//!
//! Given providers' recurring weekly hours, date-specific exceptions, the
//! appointment duration, a booking window, and the bookings already taken,
//! the engine computes every bookable start time for a day or a date range,
//! for one provider or many at once.
//!
//! The engine is a pure function of its inputs. It performs no I/O and never
//! reads the wall clock on its own: callers hand it an [`AvailabilityInputs`]
//! snapshot and a [`Clock`], so identical inputs always yield identical
//! output, and it is safe to call from any number of threads.
//!
//! ## Modules
//!
//! - [`time_grid`] — `HH:MM` clock times, weekday indexing, local → UTC instants
//! - [`dst`] — DST gap policy for wall-clock slot times
//! - [`interval`] — The half-open `overlaps` primitive
//! - [`model`] — Schedules, exceptions, bookings, appointment durations
//! - [`config`] — Validated practice configuration and booking window policy
//! - [`clock`] — Injected time source
//! - [`schedule`] — Resolve a provider's working intervals for a date
//! - [`slots`] — Enumerate candidate slots inside an interval
//! - [`conflict`] — Drop slots that collide with bookings or start too early
//! - [`window`] — Booking window validation and range clamping
//! - [`availability`] — Single-day and multi-provider range entry points
//! - [`error`] — Error types

pub mod availability;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod dst;
pub mod error;
pub mod interval;
pub mod model;
pub mod schedule;
pub mod slots;
pub mod time_grid;
pub mod window;

pub use availability::{
    AggregatedSlot, AvailabilityEngine, DailyAvailability, DailyQuery, DailyStatus,
    DateAvailability, ProviderSummary, RangeAvailability, RangeQuery, RangeStatus, SlotTime,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BookingWindowPolicy, EngineConfig, PracticeSettings};
pub use dst::DstPolicy;
pub use error::AvailabilityError;
pub use interval::{overlaps, TimeRange};
pub use model::{
    AppointmentCatalog, AvailabilityInputs, Booking, BookingStatus, DataWarning, DurationSpec,
    ExceptionKind, Provider, RecordKind, ScheduleException, WorkSchedule,
};
pub use schedule::{find_overlapping_schedules, Resolution, ScheduleResolver, WorkingInterval};
pub use time_grid::ClockTime;
pub use window::{BookingWindow, ClampedRange, WindowRejection};
