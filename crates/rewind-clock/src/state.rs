//! Published clock state and per-cycle time records.

use serde::{Deserialize, Serialize};

use crate::Cycle;

/// Time values captured for one recorded cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CycleTime {
    pub time: f64,
    pub delta_time: f64,
    pub fixed_time: f64,
    pub fixed_delta_time: f64,
}

/// Everything the clock publishes for the current host tick.
///
/// Invariants:
/// - `delta_time == 0` iff the clock is frozen (or paused).
/// - `fixed_delta_time == 0` iff frozen or applying records.
/// - `oldest_recorded_cycle <= oldest_cycle_within_rewind_limit <= newest_recorded_cycle`
///   once anything has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClockState {
    pub time: f64,
    pub delta_time: f64,
    pub fixed_time: f64,
    pub fixed_delta_time: f64,
    /// Cycle currently being visited.
    pub cycle_number: Cycle,
    pub oldest_recorded_cycle: Cycle,
    pub newest_recorded_cycle: Cycle,
    /// Oldest cycle whose `time` lies within the rewind window of the
    /// newest cycle's `time`.
    pub oldest_cycle_within_rewind_limit: Cycle,
}

impl ClockState {
    pub(crate) fn at_origin(origin: Cycle) -> Self {
        Self {
            cycle_number: origin,
            oldest_recorded_cycle: origin,
            newest_recorded_cycle: origin,
            oldest_cycle_within_rewind_limit: origin,
            ..Self::default()
        }
    }

    /// Time values of the current cycle.
    #[must_use]
    pub const fn cycle_time(&self) -> CycleTime {
        CycleTime {
            time: self.time,
            delta_time: self.delta_time,
            fixed_time: self.fixed_time,
            fixed_delta_time: self.fixed_delta_time,
        }
    }
}
