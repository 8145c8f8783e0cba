//! Single driver of the shared ring index.

use rewind_clock::ClockState;
use tracing::{debug, error, info, trace};

use crate::{Cycle, CycleIndex, SequenceError};

/// Advances the shared [`CycleIndex`] once per recorded cycle.
///
/// The sequencer and the clock keep independent counters. Every mutation
/// takes the clock's view as an argument and refuses to proceed when the
/// two disagree.
#[derive(Debug)]
pub struct CycleSequencer {
    index: CycleIndex,
}

impl CycleSequencer {
    #[must_use]
    pub fn new(capacity: usize, origin: Cycle) -> Self {
        Self {
            index: CycleIndex::new(capacity, origin),
        }
    }

    /// The index timelines read through.
    #[must_use]
    pub fn index(&self) -> &CycleIndex {
        &self.index
    }

    /// Materialize the next cycle, which the clock reports as `clock_cycle`.
    pub fn advance(&mut self, clock_cycle: Cycle) -> Result<Cycle, SequenceError> {
        let next = self.index.next_cycle();
        if next != clock_cycle {
            error!(
                clock = clock_cycle,
                index = next,
                "ring index fell out of lockstep with the clock"
            );
            return Err(SequenceError::StateDesync {
                what: "advance",
                clock: clock_cycle,
                index: Some(next),
            });
        }

        let cycle = self.index.advance();
        trace!(cycle, slot = self.index.current_index(), "ring index advanced");
        Ok(cycle)
    }

    /// Drop every cycle after `cycle` (history fork).
    pub fn fork_after(&mut self, cycle: Cycle) {
        debug!(cycle, newest = ?self.index.newest_cycle(), "ring index forked");
        self.index.truncate_after(cycle);
    }

    /// Stop answering for cycles before `cycle`.
    pub fn retire_before(&mut self, cycle: Cycle) {
        self.index.retire_before(cycle);
    }

    /// Move the read cursor to a materialized cycle.
    pub fn seek(&mut self, cycle: Cycle) -> Result<(), SequenceError> {
        self.index.seek(cycle).map_err(|err| {
            error!(cycle, %err, "clock visits a cycle the ring index does not hold");
            SequenceError::StateDesync {
                what: "seek",
                clock: cycle,
                index: self.index.newest_cycle(),
            }
        })
    }

    /// Check the index window against the clock's published state.
    pub fn verify(&self, clock: &ClockState, has_history: bool) -> Result<(), SequenceError> {
        let desync = |what: &'static str,
                      clock: Cycle,
                      index: Option<Cycle>|
         -> Result<(), SequenceError> {
            error!(what, clock, ?index, "ring index disagrees with the clock");
            Err(SequenceError::StateDesync { what, clock, index })
        };

        let newest = self.index.newest_cycle();
        if !has_history {
            return match newest {
                None => Ok(()),
                Some(_) => desync("history", clock.newest_recorded_cycle, newest),
            };
        }

        if newest != Some(clock.newest_recorded_cycle) {
            return desync("newest", clock.newest_recorded_cycle, newest);
        }
        if self.index.oldest_cycle() != Some(clock.oldest_recorded_cycle) {
            return desync("oldest", clock.oldest_recorded_cycle, self.index.oldest_cycle());
        }
        if self.index.cursor() != clock.cycle_number {
            return desync("cursor", clock.cycle_number, Some(self.index.cursor()));
        }
        Ok(())
    }

    /// Discard all index state, starting over at `origin`.
    ///
    /// Must run on every session or scene (re)start, together with dropping
    /// every timeline built on the old index.
    pub fn reset(&mut self, origin: Cycle) {
        self.index.reset(origin);
        info!(origin, capacity = self.index.capacity(), "ring index reset");
    }
}
