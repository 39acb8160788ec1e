//! DST transition policies for wall-clock slot times.

use serde::{Deserialize, Serialize};

/// Policy for slot start times that fall in a DST gap (e.g., 02:30 on the
/// spring-forward night). Ambiguous fall-back times always resolve to the
/// earlier of the two instants, independent of this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop slots whose local start time does not exist.
    Skip,
    /// Move to the first valid instant after the gap.
    #[default]
    ShiftForward,
}
