//! Per-object snapshot ring.

use tracing::{trace, warn};

use crate::{BoundsError, Cycle, CycleIndex, TimelineResult};

/// Fixed-capacity ring of snapshots for one recordable sub-object.
///
/// Slots are allocated once, at construction, and overwritten in place every
/// cycle. The timeline stores no cycle tags; reads go through the shared
/// [`CycleIndex`], which must be the index the timeline was created from.
#[derive(Debug)]
pub struct CycleTimeline<T> {
    slots: Box<[T]>,
    created_during_cycle: Cycle,
    last_written: Option<Cycle>,
    /// Cycles that hold no snapshot, as ascending inclusive ranges. Empty
    /// unless a write was skipped or failed.
    unwritten: Vec<(Cycle, Cycle)>,
}

impl<T: Default> CycleTimeline<T> {
    /// Allocate a timeline sized for `index`, born on the index's current cycle.
    #[must_use]
    pub fn new(index: &CycleIndex) -> Self {
        Self::new_with(index, T::default)
    }
}

impl<T> CycleTimeline<T> {
    /// Allocate a timeline whose slots are produced by `make_slot`.
    pub fn new_with(index: &CycleIndex, make_slot: impl FnMut() -> T) -> Self {
        let slots: Box<[T]> = std::iter::repeat_with(make_slot)
            .take(index.capacity())
            .collect();

        Self {
            slots,
            created_during_cycle: index.newest_cycle().unwrap_or_else(|| index.origin()),
            last_written: None,
            unwritten: Vec::new(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Cycle during which this timeline started recording.
    #[must_use]
    pub fn created_during_cycle(&self) -> Cycle {
        self.created_during_cycle
    }

    /// Last cycle written through [`slot_for_current_cycle`](Self::slot_for_current_cycle).
    #[must_use]
    pub fn last_written(&self) -> Option<Cycle> {
        self.last_written
    }

    /// Slot of the index's newest cycle, for writing.
    ///
    /// Call exactly once per recorded cycle. Skipped cycles keep stale slots,
    /// so they are remembered and reads of them fail with
    /// [`BoundsError::Unwritten`].
    pub fn slot_for_current_cycle(&mut self, index: &CycleIndex) -> &mut T {
        debug_assert_eq!(self.slots.len(), index.capacity(), "timeline sized for another index");

        let cycle = index.newest_cycle().unwrap_or_else(|| index.origin());
        match self.last_written {
            Some(last) if cycle > last + 1 => {
                warn!(last, cycle, "timeline skipped cycles");
                self.mark_unwritten(last + 1, cycle - 1);
            }
            Some(last) if cycle <= last => {
                trace!(last, cycle, "timeline rewriting after fork");
                // Everything from `cycle` on was discarded with the old future.
                self.unwritten.retain_mut(|(start, end)| {
                    *end = (*end).min(cycle.saturating_sub(1));
                    *start < cycle
                });
            }
            _ => {}
        }
        if let Some(oldest) = index.oldest_cycle() {
            self.unwritten.retain(|&(_, end)| end >= oldest);
        }

        if cycle < self.created_during_cycle {
            // Re-recorded from a fork that predates this timeline.
            self.created_during_cycle = cycle;
        }
        self.last_written = Some(cycle);

        &mut self.slots[index.current_index()]
    }

    /// Forget the snapshot of the last written cycle.
    ///
    /// For writers that fail halfway through filling the slot.
    pub fn invalidate_last_written(&mut self) {
        if let Some(cycle) = self.last_written {
            self.mark_unwritten(cycle, cycle);
        }
    }

    fn mark_unwritten(&mut self, start: Cycle, end: Cycle) {
        match self.unwritten.last_mut() {
            Some((_, last_end)) if *last_end + 1 >= start => *last_end = (*last_end).max(end),
            _ => self.unwritten.push((start, end)),
        }
    }

    /// Snapshot recorded for `cycle`.
    pub fn slot(&self, cycle: Cycle, index: &CycleIndex) -> TimelineResult<&T> {
        debug_assert_eq!(self.slots.len(), index.capacity(), "timeline sized for another index");

        if cycle < self.created_during_cycle {
            return Err(BoundsError::BeforeCreation {
                cycle,
                created: self.created_during_cycle,
            });
        }
        let slot = index.locate(cycle)?;

        match self.last_written {
            None => Err(BoundsError::Empty { cycle }),
            Some(last) if cycle > last => Err(BoundsError::NotYetRecorded {
                cycle,
                newest: last,
            }),
            Some(_) if self.is_unwritten(cycle) => Err(BoundsError::Unwritten { cycle }),
            Some(_) => Ok(&self.slots[slot]),
        }
    }

    fn is_unwritten(&self, cycle: Cycle) -> bool {
        self.unwritten
            .iter()
            .any(|&(start, end)| (start..=end).contains(&cycle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CycleSequencer;

    fn record(sequencer: &mut CycleSequencer, timeline: &mut Option<CycleTimeline<u64>>, value: u64) {
        let cycle = sequencer.index().next_cycle();
        sequencer.advance(cycle).unwrap();
        let timeline = timeline.get_or_insert_with(|| CycleTimeline::new(sequencer.index()));
        *timeline.slot_for_current_cycle(sequencer.index()) = value;
    }

    #[test]
    fn test_round_trip_current_cycle() {
        let mut sequencer = CycleSequencer::new(4, 0);
        let mut timeline = None;

        for cycle in 0..3 {
            record(&mut sequencer, &mut timeline, cycle * 10);
            let timeline = timeline.as_ref().unwrap();
            assert_eq!(*timeline.slot(cycle, sequencer.index()).unwrap(), cycle * 10);
        }
    }

    #[test]
    fn test_capacity_five_scenario() {
        let mut sequencer = CycleSequencer::new(5, 0);
        let mut timeline = None;

        for cycle in 0..=6 {
            record(&mut sequencer, &mut timeline, 100 + cycle);
        }

        let timeline = timeline.unwrap();
        let index = sequencer.index();
        assert!(matches!(timeline.slot(0, index), Err(BoundsError::Evicted { .. })));
        assert_eq!(
            timeline.slot(1, index),
            Err(BoundsError::Evicted { cycle: 1, oldest: 2 })
        );
        for cycle in 2..=6 {
            assert_eq!(*timeline.slot(cycle, index).unwrap(), 100 + cycle);
        }
        assert!(matches!(timeline.slot(7, index), Err(BoundsError::NotYetRecorded { .. })));
    }

    #[test]
    fn test_reads_before_creation_fail() {
        let mut sequencer = CycleSequencer::new(8, 0);
        let mut early = None;
        let mut late = None;

        record(&mut sequencer, &mut early, 1);
        record(&mut sequencer, &mut early, 2);
        record(&mut sequencer, &mut late, 20);

        let late = late.unwrap();
        assert_eq!(late.created_during_cycle(), 2);
        assert_eq!(
            late.slot(1, sequencer.index()),
            Err(BoundsError::BeforeCreation {
                cycle: 1,
                created: 2
            })
        );
        assert_eq!(*late.slot(2, sequencer.index()).unwrap(), 20);
    }

    #[test]
    fn test_fork_discards_future() {
        let mut sequencer = CycleSequencer::new(32, 0);
        let mut timeline = None;
        for cycle in 0..=10 {
            record(&mut sequencer, &mut timeline, cycle);
        }

        sequencer.seek(5).unwrap();
        sequencer.fork_after(5);
        record(&mut sequencer, &mut timeline, 600);

        let timeline = timeline.unwrap();
        let index = sequencer.index();
        assert_eq!(*timeline.slot(6, index).unwrap(), 600);
        assert_eq!(
            timeline.slot(8, index),
            Err(BoundsError::NotYetRecorded {
                cycle: 8,
                newest: 6
            })
        );
        assert_eq!(*timeline.slot(5, index).unwrap(), 5);
    }

    #[test]
    fn test_skipped_cycle_is_unwritten() {
        let mut sequencer = CycleSequencer::new(8, 0);
        let mut timeline = None;
        record(&mut sequencer, &mut timeline, 0);
        record(&mut sequencer, &mut timeline, 10);
        // Cycles 2 and 3 are materialized but never reach this timeline.
        sequencer.advance(2).unwrap();
        sequencer.advance(3).unwrap();
        record(&mut sequencer, &mut timeline, 40);

        let timeline = timeline.unwrap();
        let index = sequencer.index();
        assert_eq!(*timeline.slot(1, index).unwrap(), 10);
        assert_eq!(timeline.slot(2, index), Err(BoundsError::Unwritten { cycle: 2 }));
        assert_eq!(timeline.slot(3, index), Err(BoundsError::Unwritten { cycle: 3 }));
        assert_eq!(*timeline.slot(4, index).unwrap(), 40);
    }

    #[test]
    fn test_invalidated_cycle_is_unwritten() {
        let mut sequencer = CycleSequencer::new(8, 0);
        let mut timeline = None;
        record(&mut sequencer, &mut timeline, 1);
        record(&mut sequencer, &mut timeline, 2);

        let mut timeline = timeline.unwrap();
        timeline.invalidate_last_written();
        assert_eq!(*timeline.slot(0, sequencer.index()).unwrap(), 1);
        assert_eq!(
            timeline.slot(1, sequencer.index()),
            Err(BoundsError::Unwritten { cycle: 1 })
        );

        // The next cycle writes normally.
        sequencer.advance(2).unwrap();
        *timeline.slot_for_current_cycle(sequencer.index()) = 3;
        assert_eq!(*timeline.slot(2, sequencer.index()).unwrap(), 3);
        assert!(timeline.slot(1, sequencer.index()).is_err());
    }

    #[test]
    fn test_fork_rewrite_clears_discarded_gap() {
        let mut sequencer = CycleSequencer::new(8, 0);
        let mut timeline = None;
        record(&mut sequencer, &mut timeline, 0);
        record(&mut sequencer, &mut timeline, 1);
        sequencer.advance(2).unwrap();
        record(&mut sequencer, &mut timeline, 3);

        sequencer.seek(1).unwrap();
        sequencer.fork_after(1);
        record(&mut sequencer, &mut timeline, 22);

        let timeline = timeline.unwrap();
        assert_eq!(*timeline.slot(2, sequencer.index()).unwrap(), 22);
    }

    #[test]
    fn test_gaps_fall_out_with_eviction() {
        let mut sequencer = CycleSequencer::new(4, 0);
        let mut timeline = None;
        record(&mut sequencer, &mut timeline, 0);
        sequencer.advance(1).unwrap();
        for value in 2..=6 {
            record(&mut sequencer, &mut timeline, value);
        }

        let timeline = timeline.unwrap();
        assert!(timeline.unwritten.is_empty());
        assert!(matches!(
            timeline.slot(1, sequencer.index()),
            Err(BoundsError::Evicted { .. })
        ));
    }

    #[test]
    fn test_slots_are_preallocated() {
        let index = CycleIndex::new(6, 0);
        let timeline: CycleTimeline<Vec<u8>> = CycleTimeline::new_with(&index, || Vec::with_capacity(32));
        assert_eq!(timeline.capacity(), 6);
        assert_eq!(timeline.last_written(), None);
        assert!(timeline.slots.iter().all(|slot| slot.capacity() >= 32));
    }
}
