//! The one definition of "these two ranges conflict".
//!
//! All ranges are half-open `[start, end)`. Two ranges overlap iff
//! `a.start < b.end && b.start < a.end`, so ranges that merely touch
//! (`a.end == b.start`) do not overlap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Half-open overlap test, generic over anything ordered (instants, minute
/// offsets, dates).
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// An absolute `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeRange { start, end }
    }

    /// Positive length. Zero-length and inverted ranges are malformed.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}
