//! Per-provider, per-day availability and its aggregation across providers.
//!
//! For one (provider, date) pair the pipeline is:
//!
//! ```text
//! ScheduleResolver::resolve → slots::candidates (per interval) → conflict::filter
//! ```
//!
//! A range query runs that pipeline for every date in the clamped range times
//! every eligible provider. The pairs are independent, so they fan out over a
//! rayon pool; results are merged into ordered maps, so completion order never
//! shows up in the output.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::config::{BookingWindowPolicy, EngineConfig};
use crate::conflict::{self, BookingIndex};
use crate::error::{AvailabilityError, Result};
use crate::model::{AvailabilityInputs, DataWarning, DurationSpec, Provider};
use crate::schedule::{Resolution, ScheduleResolver, UnavailableReason};
use crate::slots::{self, CandidateSlot};
use crate::time_grid::{self, format_minutes};
use crate::window::{BookingWindow, ClampedRange};

/// Availability of one provider on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuery {
    pub provider_id: String,
    pub date: NaiveDate,
    pub duration: DurationSpec,
    /// Overrides the configured booking window for this request.
    #[serde(default)]
    pub policy: Option<BookingWindowPolicy>,
}

/// Merged availability of several providers over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeQuery {
    /// Restrict to these providers. `None` means every provider in the roster.
    #[serde(default)]
    pub provider_ids: Option<Vec<String>>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: DurationSpec,
    #[serde(default)]
    pub policy: Option<BookingWindowPolicy>,
}

/// One free slot, as practice-local wall-clock labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTime {
    /// `HH:MM`.
    pub start_time: String,
    /// `HH:MM`, or `24:00` for a slot ending at midnight. Across a DST change
    /// this is the label the end actually falls on.
    pub end_time: String,
}

impl From<&CandidateSlot> for SlotTime {
    fn from(slot: &CandidateSlot) -> Self {
        SlotTime {
            start_time: slot.start_time(),
            end_time: slot.end_time(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyStatus {
    /// At least one slot is free.
    Open,
    /// The provider works that day but every slot is taken or too early.
    FullyBooked,
    /// An absence exception covers the date.
    Absent,
    /// Neither an exception nor a weekly schedule applies.
    NoScheduleConfigured,
    /// The provider is not in the roster for this appointment type.
    NotEligible,
}

/// Answer to a [`DailyQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAvailability {
    pub provider_id: String,
    pub date: NaiveDate,
    /// Resolved length, whether the query gave minutes or an appointment type.
    pub duration_minutes: u32,
    pub status: DailyStatus,
    /// Ascending by start. Empty unless `status` is [`DailyStatus::Open`].
    pub slots: Vec<SlotTime>,
    /// Bounds the date was checked against.
    pub window: BookingWindow,
    /// Malformed input rows skipped while answering.
    pub warnings: Vec<DataWarning>,
}

/// One distinct start time on a date, with every provider free at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSlot {
    pub start_time: String,
    pub end_time: String,
    /// Sorted ascending.
    pub provider_ids: Vec<String>,
}

/// Per-provider totals for one date of a range answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub provider_id: String,
    /// Copied from the matching [`Provider`].
    pub display_name: String,
    /// Free slots this provider has on the date.
    pub slot_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateAvailability {
    /// Sorted by start time, one entry per distinct start.
    pub slots: Vec<AggregatedSlot>,
    /// Providers with at least one slot that date, sorted by id.
    pub providers: Vec<ProviderSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    Open,
    /// Providers work in the range but nothing is free.
    NoSlots,
    NoEligibleProviders,
    /// No eligible provider has hours on any date in the range.
    NoScheduleConfigured,
    /// Clamping to the booking window left no dates.
    OutsideBookingWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeAvailability {
    /// Only dates with at least one slot appear. A missing date means no
    /// availability, not missing data.
    pub by_date: BTreeMap<NaiveDate, DateAvailability>,
    pub status: RangeStatus,
    pub duration_minutes: u32,
    /// The requested bounds and what survived clamping to the window.
    pub range: ClampedRange,
    pub window: BookingWindow,
    pub warnings: Vec<DataWarning>,
}

impl RangeAvailability {
    /// Earliest open slot across the whole range.
    pub fn first_available(&self) -> Option<(NaiveDate, &AggregatedSlot)> {
        self.by_date
            .iter()
            .find_map(|(date, day)| day.slots.first().map(|slot| (*date, slot)))
    }

    pub fn slot_count(&self) -> usize {
        self.by_date.values().map(|day| day.slots.len()).sum()
    }
}

/// Outcome of the single-day pipeline for one provider.
struct ProviderDay {
    resolution: Resolution,
    slots: Vec<CandidateSlot>,
}

/// Stateless availability computation over caller-supplied inputs.
///
/// Holds only validated configuration (and, optionally, a dedicated worker
/// pool), so one engine can serve any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct AvailabilityEngine {
    config: EngineConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl AvailabilityEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let pool = match config.worker_threads {
            Some(threads) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("availability-{}", i))
                    .build()
                    .map_err(|e| AvailabilityError::WorkerPool(e.to_string()))?,
            )),
            None => None,
        };
        Ok(AvailabilityEngine { config, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn window(&self, policy: Option<BookingWindowPolicy>, now: DateTime<Utc>) -> Result<BookingWindow> {
        let policy = policy.unwrap_or(self.config.booking_window);
        policy.validate()?;
        Ok(BookingWindow::new(
            &policy,
            time_grid::today(now, self.config.timezone),
        ))
    }

    fn provider_day(
        &self,
        resolver: &ScheduleResolver<'_>,
        bookings: &BookingIndex<'_>,
        provider_id: &str,
        date: NaiveDate,
        duration_minutes: u32,
        cutoff: DateTime<Utc>,
    ) -> ProviderDay {
        let resolution = resolver.resolve(provider_id, date);

        let mut candidates: Vec<CandidateSlot> = resolution
            .intervals()
            .iter()
            .flat_map(|interval| {
                slots::candidates(
                    provider_id,
                    date,
                    interval,
                    duration_minutes,
                    self.config.timezone,
                    self.config.dst_policy,
                )
            })
            .collect();
        // Split shifts may touch or (with bad data) overlap.
        candidates.sort_by_key(|slot| (slot.start, slot.start_minutes));
        candidates.dedup_by_key(|slot| slot.start);

        let slots = conflict::filter(candidates, bookings.for_provider(provider_id), cutoff);
        ProviderDay { resolution, slots }
    }

    /// Open slots for one provider on one date.
    ///
    /// A date outside the booking window is rejected with
    /// [`AvailabilityError::OutsideBookingWindow`].
    #[instrument(skip_all, fields(provider_id = %query.provider_id, date = %query.date))]
    pub fn daily_availability(
        &self,
        inputs: &AvailabilityInputs,
        query: &DailyQuery,
        clock: &dyn Clock,
    ) -> Result<DailyAvailability> {
        if query.provider_id.trim().is_empty() {
            return Err(AvailabilityError::invalid("provider_id", "must not be empty"));
        }
        let duration_minutes = inputs.appointment_types.resolve(&query.duration)?;

        let now = clock.now();
        let window = self.window(query.policy, now)?;
        window.validate(query.date)?;

        let provider_id = query.provider_id.as_str();
        let resolver = ScheduleResolver::new(
            inputs.schedules.iter().filter(|s| s.provider_id == provider_id),
            inputs.exceptions.iter().filter(|e| e.provider_id == provider_id),
            self.config.default_granularity_minutes,
        );
        let bookings = BookingIndex::new(
            inputs.bookings.iter().filter(|b| b.provider_id == provider_id),
        );
        let warnings = merge_warnings(&resolver, &bookings);

        if inputs.provider(provider_id).is_none() {
            debug!("provider is not in the eligible roster");
            return Ok(DailyAvailability {
                provider_id: query.provider_id.clone(),
                date: query.date,
                duration_minutes,
                status: DailyStatus::NotEligible,
                slots: Vec::new(),
                window,
                warnings,
            });
        }

        let cutoff = window.notice_cutoff(now, self.config.timezone);
        let day = self.provider_day(
            &resolver,
            &bookings,
            provider_id,
            query.date,
            duration_minutes,
            cutoff,
        );

        let status = match (&day.resolution, day.slots.is_empty()) {
            (Resolution::Unavailable(UnavailableReason::Absence), _) => DailyStatus::Absent,
            (Resolution::Unavailable(UnavailableReason::NoSchedule), _) => {
                DailyStatus::NoScheduleConfigured
            }
            (Resolution::Working(_), true) => DailyStatus::FullyBooked,
            (Resolution::Working(_), false) => DailyStatus::Open,
        };
        debug!(slots = day.slots.len(), ?status, "computed daily availability");

        Ok(DailyAvailability {
            provider_id: query.provider_id.clone(),
            date: query.date,
            duration_minutes,
            status,
            slots: day.slots.iter().map(SlotTime::from).collect(),
            window,
            warnings,
        })
    }

    /// Merged open slots for many providers across a date range.
    ///
    /// The range is clamped to the booking window rather than rejected; the
    /// clamped bounds are reported in [`RangeAvailability::range`].
    #[instrument(skip_all, fields(start = %query.start_date, end = %query.end_date))]
    pub fn range_availability(
        &self,
        inputs: &AvailabilityInputs,
        query: &RangeQuery,
        clock: &dyn Clock,
    ) -> Result<RangeAvailability> {
        if query.start_date > query.end_date {
            return Err(AvailabilityError::invalid(
                "end_date",
                format!("{} is before start_date {}", query.end_date, query.start_date),
            ));
        }
        if let Some(ids) = &query.provider_ids {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(AvailabilityError::invalid(
                    "provider_ids",
                    "must not contain empty ids",
                ));
            }
        }
        let duration_minutes = inputs.appointment_types.resolve(&query.duration)?;

        let now = clock.now();
        let window = self.window(query.policy, now)?;
        let range = window.clamp(query.start_date, query.end_date);

        let providers = eligible_providers(inputs, query.provider_ids.as_deref());
        let scope: HashSet<&str> = providers.iter().map(|p| p.id.as_str()).collect();

        let resolver = ScheduleResolver::new(
            inputs.schedules.iter().filter(|s| scope.contains(s.provider_id.as_str())),
            inputs.exceptions.iter().filter(|e| scope.contains(e.provider_id.as_str())),
            self.config.default_granularity_minutes,
        );
        let bookings = BookingIndex::new(
            inputs.bookings.iter().filter(|b| scope.contains(b.provider_id.as_str())),
        );
        let warnings = merge_warnings(&resolver, &bookings);

        let empty = |status| RangeAvailability {
            by_date: BTreeMap::new(),
            status,
            duration_minutes,
            range,
            window,
            warnings: warnings.clone(),
        };
        if providers.is_empty() {
            debug!("no eligible providers");
            return Ok(empty(RangeStatus::NoEligibleProviders));
        }
        if range.is_empty() {
            debug!("requested range lies entirely outside the booking window");
            return Ok(empty(RangeStatus::OutsideBookingWindow));
        }

        let cutoff = window.notice_cutoff(now, self.config.timezone);
        let tasks: Vec<(NaiveDate, &Provider)> = range
            .dates()
            .flat_map(|date| providers.iter().map(move |p| (date, *p)))
            .collect();

        let results: Vec<(NaiveDate, &Provider, ProviderDay)> = self.run(|| {
            tasks
                .par_iter()
                .map(|&(date, provider)| {
                    let day = self.provider_day(
                        &resolver,
                        &bookings,
                        &provider.id,
                        date,
                        duration_minutes,
                        cutoff,
                    );
                    (date, provider, day)
                })
                .collect()
        });

        let any_hours = results.iter().any(|(_, _, day)| {
            !matches!(
                day.resolution,
                Resolution::Unavailable(UnavailableReason::NoSchedule)
            )
        });
        let by_date = merge_days(&results);

        let status = if !by_date.is_empty() {
            RangeStatus::Open
        } else if any_hours {
            RangeStatus::NoSlots
        } else {
            RangeStatus::NoScheduleConfigured
        };
        debug!(
            providers = providers.len(),
            dates = by_date.len(),
            ?status,
            "computed range availability"
        );

        Ok(RangeAvailability {
            by_date,
            status,
            duration_minutes,
            range,
            window,
            warnings,
        })
    }

    /// Run `op` on the dedicated pool when one is configured.
    fn run<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Roster entries eligible for the query, sorted and de-duplicated by id.
fn eligible_providers<'a>(inputs: &'a AvailabilityInputs, requested: Option<&[String]>) -> Vec<&'a Provider> {
    let mut providers: Vec<&Provider> = inputs
        .providers
        .iter()
        .filter(|p| requested.is_none_or(|ids| ids.iter().any(|id| *id == p.id)))
        .collect();
    providers.sort_by(|a, b| a.id.cmp(&b.id));
    providers.dedup_by(|a, b| a.id == b.id);
    providers
}

fn merge_warnings(resolver: &ScheduleResolver<'_>, bookings: &BookingIndex<'_>) -> Vec<DataWarning> {
    let mut warnings: Vec<DataWarning> = resolver
        .warnings()
        .iter()
        .chain(bookings.warnings())
        .cloned()
        .collect();
    warnings.sort();
    warnings.dedup();
    warnings
}

/// Union per-provider slots into one entry per distinct start time per date.
fn merge_days(results: &[(NaiveDate, &Provider, ProviderDay)]) -> BTreeMap<NaiveDate, DateAvailability> {
    #[derive(Default)]
    struct DayAccumulator<'a> {
        // start minutes → (end minutes, providers free at that start)
        slots: BTreeMap<u32, (u32, BTreeSet<&'a str>)>,
        // provider id → (display name, slot count)
        providers: BTreeMap<&'a str, (&'a str, usize)>,
    }

    let mut days: BTreeMap<NaiveDate, DayAccumulator<'_>> = BTreeMap::new();
    for (date, provider, day) in results {
        if day.slots.is_empty() {
            continue;
        }
        let acc = days.entry(*date).or_default();
        for slot in &day.slots {
            acc.slots
                .entry(slot.start_minutes)
                .or_insert_with(|| (slot.end_minutes, BTreeSet::new()))
                .1
                .insert(provider.id.as_str());
        }
        acc.providers
            .insert(provider.id.as_str(), (provider.display_name.as_str(), day.slots.len()));
    }

    days.into_iter()
        .map(|(date, acc)| {
            let slots = acc
                .slots
                .into_iter()
                .map(|(start, (end, ids))| AggregatedSlot {
                    start_time: format_minutes(start),
                    end_time: format_minutes(end),
                    provider_ids: ids.into_iter().map(str::to_string).collect(),
                })
                .collect();
            let providers = acc
                .providers
                .into_iter()
                .map(|(id, (name, count))| ProviderSummary {
                    provider_id: id.to_string(),
                    display_name: name.to_string(),
                    slot_count: count,
                })
                .collect();
            (date, DateAvailability { slots, providers })
        })
        .collect()
}
