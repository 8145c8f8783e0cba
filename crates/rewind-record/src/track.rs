//! Type-erased per-sub-object timelines.

use std::sync::Arc;

use rewind_timeline::{Cycle, CycleIndex, CycleTimeline};

use crate::{RecordChain, RecordResult, Snapshot, SubObject};

/// One sub-object's recorded history, hiding the record type.
pub trait Track: Send {
    /// Name of the chain or generic kind backing this track.
    fn record_name(&self) -> &'static str;

    fn created_during_cycle(&self) -> Cycle;

    /// Capture `object` into the slot for the index's newest cycle.
    fn write(&mut self, object: &dyn SubObject, index: &CycleIndex) -> RecordResult<()>;

    /// Restore `object` from the snapshot recorded for `cycle`.
    fn apply(&self, object: &mut dyn SubObject, cycle: Cycle, index: &CycleIndex) -> RecordResult<()>;
}

/// A [`Track`] running a shared [`RecordChain`] over its own timeline.
pub struct ChainTrack<R> {
    name: &'static str,
    chain: Arc<RecordChain<R>>,
    timeline: CycleTimeline<Snapshot<R>>,
}

impl<R: Default + 'static> ChainTrack<R> {
    #[must_use]
    pub fn new(name: &'static str, chain: Arc<RecordChain<R>>, index: &CycleIndex) -> Self {
        Self {
            name,
            chain,
            timeline: CycleTimeline::new(index),
        }
    }

    #[must_use]
    pub fn timeline(&self) -> &CycleTimeline<Snapshot<R>> {
        &self.timeline
    }
}

impl<R: Default + Send + Sync + 'static> Track for ChainTrack<R> {
    fn record_name(&self) -> &'static str {
        self.name
    }

    fn created_during_cycle(&self) -> Cycle {
        self.timeline.created_during_cycle()
    }

    fn write(&mut self, object: &dyn SubObject, index: &CycleIndex) -> RecordResult<()> {
        let slot = self.timeline.slot_for_current_cycle(index);
        let result = self.chain.capture(object, slot);
        if result.is_err() {
            // A partly filled slot must never be applied.
            self.timeline.invalidate_last_written();
        }
        result
    }

    fn apply(&self, object: &mut dyn SubObject, cycle: Cycle, index: &CycleIndex) -> RecordResult<()> {
        let slot = self.timeline.slot(cycle, index)?;
        self.chain.apply(object, slot)
    }
}

#[cfg(test)]
mod tests {
    use rewind_timeline::{BoundsError, CycleSequencer};

    use super::*;
    use crate::RecordError;

    #[derive(Default)]
    struct Counter {
        value: u32,
    }

    impl SubObject for Counter {}

    fn counter_chain() -> Arc<RecordChain<u32>> {
        Arc::new(RecordChain::<u32>::with_common_data().typed_step::<Counter>(
            "counter",
            |counter, record| *record = counter.value,
            |counter, record| counter.value = *record,
        ))
    }

    #[test]
    fn test_write_then_apply_each_cycle() {
        let mut sequencer = CycleSequencer::new(4, 0);
        sequencer.advance(0).unwrap();
        let mut track = ChainTrack::new("counter", counter_chain(), sequencer.index());

        let mut counter = Counter::default();
        for cycle in 0..3_u64 {
            if cycle > 0 {
                sequencer.advance(cycle).unwrap();
            }
            counter.value = u32::try_from(cycle * 10).unwrap();
            track.write(&counter, sequencer.index()).unwrap();
        }

        for cycle in 0..3_u64 {
            track.apply(&mut counter, cycle, sequencer.index()).unwrap();
            assert_eq!(u64::from(counter.value), cycle * 10);
        }
    }

    #[test]
    fn test_failed_capture_leaves_cycle_unwritten() {
        let chain = Arc::new(RecordChain::<u32>::new().step(
            "refuse-odd",
            |object, snapshot| {
                let value = object
                    .as_any()
                    .downcast_ref::<Counter>()
                    .map_or(0, |counter| counter.value);
                if value % 2 == 1 {
                    return Err(RecordError::State(format!("odd value {value}")));
                }
                snapshot.payload = value;
                Ok(())
            },
            |_, _| Ok(()),
        ));

        let mut sequencer = CycleSequencer::new(4, 0);
        sequencer.advance(0).unwrap();
        let mut track = ChainTrack::new("refuse-odd", chain, sequencer.index());
        track.write(&Counter { value: 2 }, sequencer.index()).unwrap();

        sequencer.advance(1).unwrap();
        assert!(track.write(&Counter { value: 3 }, sequencer.index()).is_err());

        let mut counter = Counter::default();
        track.apply(&mut counter, 0, sequencer.index()).unwrap();
        let err = track.apply(&mut counter, 1, sequencer.index()).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Bounds(BoundsError::Unwritten { cycle: 1 })
        ));
    }

    #[test]
    fn test_apply_before_creation_is_flagged() {
        let mut sequencer = CycleSequencer::new(4, 0);
        sequencer.advance(0).unwrap();
        sequencer.advance(1).unwrap();

        let mut track = ChainTrack::new("counter", counter_chain(), sequencer.index());
        let mut counter = Counter { value: 7 };
        track.write(&counter, sequencer.index()).unwrap();
        assert_eq!(track.created_during_cycle(), 1);

        let err = track.apply(&mut counter, 0, sequencer.index()).unwrap_err();
        assert!(err.is_before_creation());
        assert!(matches!(
            err,
            RecordError::Bounds(BoundsError::BeforeCreation { cycle: 0, created: 1 })
        ));
    }
}
