//! The shared ring index.
//!
//! One instance per session, owned by the [`CycleSequencer`](crate::CycleSequencer)
//! and lent to timelines by reference. Slot for cycle `c` is
//! `(c - origin) mod capacity`.

use crate::{BoundsError, Cycle, TimelineResult};

/// Shared cycle-to-slot translation for every timeline of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleIndex {
    capacity: usize,
    /// Cycle stored in slot 0 on the first lap.
    origin: Cycle,
    /// Slot of the newest materialized cycle.
    current_index: usize,
    /// Oldest materialized cycle.
    oldest: Cycle,
    /// Newest materialized cycle, `None` until the first advance.
    newest: Option<Cycle>,
    /// Cycle being visited. Equals `newest` while recording.
    cursor: Cycle,
}

impl CycleIndex {
    /// Create an empty index. A zero capacity is bumped to one.
    #[must_use]
    pub fn new(capacity: usize, origin: Cycle) -> Self {
        Self {
            capacity: capacity.max(1),
            origin,
            current_index: 0,
            oldest: origin,
            newest: None,
            cursor: origin,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn origin(&self) -> Cycle {
        self.origin
    }

    /// Slot holding the newest cycle.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Oldest materialized cycle, if any.
    #[must_use]
    pub fn oldest_cycle(&self) -> Option<Cycle> {
        self.newest.map(|_| self.oldest)
    }

    /// Newest materialized cycle, if any.
    #[must_use]
    pub fn newest_cycle(&self) -> Option<Cycle> {
        self.newest
    }

    /// Cycle currently being visited.
    #[must_use]
    pub fn cursor(&self) -> Cycle {
        self.cursor
    }

    /// The cursor sits on the newest cycle, so writes are allowed.
    #[must_use]
    pub fn is_at_head(&self) -> bool {
        self.newest == Some(self.cursor)
    }

    /// Cycle the next [`advance`](Self::advance) will materialize.
    #[must_use]
    pub fn next_cycle(&self) -> Cycle {
        self.newest.map_or(self.origin, |newest| newest + 1)
    }

    /// Ring slot for `cycle`, without a bounds check.
    #[must_use]
    pub fn slot_of(&self, cycle: Cycle) -> usize {
        (cycle.wrapping_sub(self.origin) % self.capacity as Cycle) as usize
    }

    /// Ring slot for a materialized `cycle`.
    pub fn locate(&self, cycle: Cycle) -> TimelineResult<usize> {
        let Some(newest) = self.newest else {
            return Err(BoundsError::Empty { cycle });
        };
        if cycle > newest {
            return Err(BoundsError::NotYetRecorded { cycle, newest });
        }
        if cycle < self.oldest {
            return Err(BoundsError::Evicted {
                cycle,
                oldest: self.oldest,
            });
        }
        Ok(self.slot_of(cycle))
    }

    // Mutation is reserved for the sequencer.

    pub(crate) fn advance(&mut self) -> Cycle {
        let cycle = self.next_cycle();
        self.newest = Some(cycle);
        self.cursor = cycle;
        self.current_index = self.slot_of(cycle);

        let lap_start = (cycle + 1).saturating_sub(self.capacity as Cycle);
        self.oldest = self.oldest.max(lap_start).max(self.origin);
        cycle
    }

    pub(crate) fn truncate_after(&mut self, cycle: Cycle) {
        let Some(newest) = self.newest else {
            return;
        };
        if cycle >= newest {
            return;
        }
        let cycle = cycle.max(self.oldest);
        self.newest = Some(cycle);
        self.cursor = cycle;
        self.current_index = self.slot_of(cycle);
    }

    pub(crate) fn retire_before(&mut self, cycle: Cycle) {
        if let Some(newest) = self.newest {
            self.oldest = self.oldest.max(cycle.min(newest));
        }
    }

    pub(crate) fn seek(&mut self, cycle: Cycle) -> TimelineResult<()> {
        self.locate(cycle)?;
        self.cursor = cycle;
        Ok(())
    }

    pub(crate) fn reset(&mut self, origin: Cycle) {
        *self = Self::new(self.capacity, origin);
    }
}
