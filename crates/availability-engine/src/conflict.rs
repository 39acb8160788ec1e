//! Remove candidate slots that collide with existing bookings or start too early.
//!
//! Overlap uses the half-open rule from [`crate::interval`]: a slot ending
//! exactly when a booking starts (or starting exactly when one ends) is NOT a
//! conflict.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::interval::TimeRange;
use crate::model::{Booking, DataWarning, RecordKind};
use crate::slots::CandidateSlot;

/// Time-blocking bookings grouped per provider, sorted by start.
///
/// Cancelled and no-show bookings are dropped here, before any comparison.
/// Bookings with `start >= end` are dropped too and reported as warnings so
/// they cannot produce false conflicts.
#[derive(Debug, Default)]
pub struct BookingIndex<'a> {
    by_provider: HashMap<&'a str, Vec<TimeRange>>,
    warnings: Vec<DataWarning>,
}

impl<'a> BookingIndex<'a> {
    pub fn new<I>(bookings: I) -> Self
    where
        I: IntoIterator<Item = &'a Booking>,
    {
        let mut by_provider: HashMap<&'a str, Vec<TimeRange>> = HashMap::new();
        let mut warnings = Vec::new();

        for booking in bookings {
            if !booking.status.blocks_time() {
                continue;
            }
            let range = booking.range();
            if !range.is_well_formed() {
                warn!(booking_id = %booking.id, "skipping booking whose start is not before its end");
                warnings.push(DataWarning::new(
                    RecordKind::Booking,
                    &booking.id,
                    format!("start {} is not before end {}", booking.start, booking.end),
                ));
                continue;
            }
            by_provider
                .entry(booking.provider_id.as_str())
                .or_default()
                .push(range);
        }
        for ranges in by_provider.values_mut() {
            ranges.sort();
        }
        warnings.sort();

        BookingIndex {
            by_provider,
            warnings,
        }
    }

    pub fn for_provider(&self, provider_id: &str) -> &[TimeRange] {
        self.by_provider
            .get(provider_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }
}

/// Whether `slot` overlaps any of `bookings` (sorted by start).
pub fn collides(slot: &TimeRange, bookings: &[TimeRange]) -> bool {
    // Only bookings starting before the slot ends can overlap it.
    let starts_before_end = bookings.partition_point(|b| b.start < slot.end);
    bookings[..starts_before_end]
        .iter()
        .any(|booking| booking.overlaps(slot))
}

/// Keep the candidates that start at or after `cutoff` and overlap none of
/// `bookings`. `bookings` must belong to the candidates' provider and be
/// sorted by start, as returned by [`BookingIndex::for_provider`].
///
/// `cutoff` is the later of `now` and the start of the first bookable day;
/// see [`crate::window::BookingWindow::notice_cutoff`].
pub fn filter(
    candidates: Vec<CandidateSlot>,
    bookings: &[TimeRange],
    cutoff: DateTime<Utc>,
) -> Vec<CandidateSlot> {
    candidates
        .into_iter()
        .filter(|slot| slot.start >= cutoff && !collides(&slot.range(), bookings))
        .collect()
}
