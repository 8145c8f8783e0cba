//! Per-entity recorder.

use std::{fmt, sync::Arc};

use rewind_clock::{Cycle, CycleStep};
use rewind_record::{RecordRegistry, RecordResult, SubObject, Track, TrackFactory};
use rewind_timeline::{BoundsError, CycleIndex, CycleTimeline};
use tracing::{trace, warn};

use crate::Entity;

/// Handle to a sub-object attached to an [`EntityRecorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(u32);

impl PartId {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}", self.0)
    }
}

/// What recorders do during the record phase of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderAction {
    /// Capture every sub-object into the newest cycle's slot.
    Write,
    /// Restore every sub-object from the given recorded cycle.
    Apply(Cycle),
    /// Parked or paused: touch nothing.
    Idle,
}

impl RecorderAction {
    /// Action matching what the clock did at the cycle boundary.
    #[must_use]
    pub fn for_step(step: CycleStep) -> Self {
        match step {
            CycleStep::Recorded { .. } => Self::Write,
            CycleStep::Applied { cycle, .. } => Self::Apply(cycle),
            CycleStep::Paused | CycleStep::Idle { .. } => Self::Idle,
        }
    }
}

struct Part {
    object: Box<dyn SubObject>,
    factory: Arc<dyn TrackFactory>,
    /// Created on the first recorded cycle after attach.
    track: Option<Box<dyn Track>>,
}

/// Records and restores every sub-object of one entity.
///
/// Each attached sub-object gets its own timeline, created lazily the first
/// time a cycle is written. The entity's active flag has a timeline of its
/// own, so a rewind across a deactivation brings the entity back.
pub struct EntityRecorder {
    entity: Entity,
    active: bool,
    active_timeline: Option<CycleTimeline<bool>>,
    parts: Vec<Option<Part>>,
}

impl EntityRecorder {
    #[must_use]
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            active: true,
            active_timeline: None,
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivation does not stop recording.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Attach a sub-object; its record chain is resolved once, here.
    pub fn attach(&mut self, object: impl SubObject, registry: &RecordRegistry) -> PartId {
        self.attach_boxed(Box::new(object), registry)
    }

    pub fn attach_boxed(&mut self, object: Box<dyn SubObject>, registry: &RecordRegistry) -> PartId {
        let factory = registry.resolve(&*object);
        let id = PartId(u32::try_from(self.parts.len()).unwrap_or(u32::MAX));
        trace!(entity = %self.entity, part = %id, record = factory.record_name(), "attached");

        self.parts.push(Some(Part {
            object,
            factory,
            track: None,
        }));
        id
    }

    /// Remove a sub-object, dropping its timeline.
    pub fn detach(&mut self, part: PartId) -> Option<Box<dyn SubObject>> {
        let removed = self.parts.get_mut(part.0 as usize)?.take()?;
        trace!(entity = %self.entity, %part, "detached");
        Some(removed.object)
    }

    #[must_use]
    pub fn part(&self, part: PartId) -> Option<&dyn SubObject> {
        self.slot(part).map(|part| &*part.object)
    }

    #[must_use]
    pub fn get<S: SubObject>(&self, part: PartId) -> Option<&S> {
        let object: &dyn SubObject = &*self.slot(part)?.object;
        object.as_any().downcast_ref()
    }

    pub fn get_mut<S: SubObject>(&mut self, part: PartId) -> Option<&mut S> {
        let object: &mut dyn SubObject = &mut *self.parts.get_mut(part.0 as usize)?.as_mut()?.object;
        object.as_any_mut().downcast_mut()
    }

    /// First attached sub-object of type `S`.
    #[must_use]
    pub fn find<S: SubObject>(&self) -> Option<&S> {
        self.parts
            .iter()
            .flatten()
            .find_map(|part| (*part.object).as_any().downcast_ref())
    }

    pub fn find_mut<S: SubObject>(&mut self) -> Option<&mut S> {
        self.parts
            .iter_mut()
            .flatten()
            .find_map(|part| (*part.object).as_any_mut().downcast_mut())
    }

    /// Handles of every attached sub-object, in attach order.
    pub fn parts(&self) -> impl Iterator<Item = PartId> + '_ {
        self.parts
            .iter()
            .enumerate()
            .filter(|(_, part)| part.is_some())
            .map(|(id, _)| PartId(u32::try_from(id).unwrap_or(u32::MAX)))
    }

    /// Name of the record chain resolved for `part`.
    #[must_use]
    pub fn record_name(&self, part: PartId) -> Option<&'static str> {
        self.slot(part).map(|part| part.factory.record_name())
    }

    /// Whether `part` has recorded anything yet.
    #[must_use]
    pub fn has_timeline(&self, part: PartId) -> bool {
        self.slot(part).is_some_and(|part| part.track.is_some())
    }

    /// Cycle during which `part` started recording.
    #[must_use]
    pub fn created_during_cycle(&self, part: PartId) -> Option<Cycle> {
        self.slot(part)?.track.as_ref().map(|track| track.created_during_cycle())
    }

    /// Drop every timeline. Required whenever the ring index is reset.
    pub fn clear_history(&mut self) {
        self.active_timeline = None;
        for part in self.parts.iter_mut().flatten() {
            part.track = None;
        }
    }

    /// Run this cycle's action over the active flag and every sub-object.
    pub fn record_cycle(&mut self, action: RecorderAction, index: &CycleIndex) -> RecordResult<()> {
        match action {
            RecorderAction::Idle => Ok(()),
            RecorderAction::Write => self.write(index),
            RecorderAction::Apply(cycle) => self.apply(cycle, index),
        }
    }

    fn write(&mut self, index: &CycleIndex) -> RecordResult<()> {
        let active = self
            .active_timeline
            .get_or_insert_with(|| CycleTimeline::new(index));
        *active.slot_for_current_cycle(index) = self.active;

        // Every part writes even if one fails, so a single bad sub-object
        // cannot leave gaps in the others' timelines.
        let mut first_error = None;
        for part in self.parts.iter_mut().flatten() {
            let track = part.track.get_or_insert_with(|| part.factory.create(index));
            if let Err(err) = track.write(&*part.object, index) {
                warn!(entity = %self.entity, record = track.record_name(), %err, "capture failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn apply(&mut self, cycle: Cycle, index: &CycleIndex) -> RecordResult<()> {
        if let Some(timeline) = &self.active_timeline {
            match timeline.slot(cycle, index) {
                Ok(active) => self.active = *active,
                Err(BoundsError::BeforeCreation { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let mut first_error = None;
        for part in self.parts.iter_mut().flatten() {
            // Attached after the last recorded cycle: nothing to restore.
            let Some(track) = &part.track else {
                continue;
            };
            match track.apply(&mut *part.object, cycle, index) {
                Ok(()) => {}
                Err(err) if err.is_before_creation() => {
                    trace!(entity = %self.entity, cycle, "part created after visited cycle");
                }
                Err(err) => {
                    warn!(entity = %self.entity, record = track.record_name(), cycle, %err, "apply failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn slot(&self, part: PartId) -> Option<&Part> {
        self.parts.get(part.0 as usize)?.as_ref()
    }
}

impl fmt::Debug for EntityRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRecorder")
            .field("entity", &self.entity)
            .field("active", &self.active)
            .field("parts", &self.parts().count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rewind_record::{Capabilities, RecordError, Recordable};
    use rewind_timeline::CycleSequencer;

    use super::*;
    use crate::EntityAllocator;

    #[derive(Default)]
    struct Health(i32);

    impl SubObject for Health {}

    impl Recordable for Health {
        type Record = i32;

        fn capture(&self, record: &mut i32) {
            *record = self.0;
        }

        fn apply(&mut self, record: &i32) {
            self.0 = *record;
        }
    }

    struct Light {
        on: bool,
    }

    impl SubObject for Light {
        fn capabilities(&self) -> Capabilities {
            Capabilities::ENABLE
        }

        fn is_enabled(&self) -> bool {
            self.on
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.on = enabled;
        }
    }

    /// Refuses to save its state.
    struct Jammed;

    impl SubObject for Jammed {
        fn capabilities(&self) -> Capabilities {
            Capabilities::STATE
        }

        fn save_state(&self, _out: &mut Vec<u8>) -> RecordResult<()> {
            Err(RecordError::State("jammed".into()))
        }
    }

    fn setup() -> (EntityRecorder, RecordRegistry, CycleSequencer) {
        let mut registry = RecordRegistry::new();
        registry.register::<Health>();
        let entity = EntityAllocator::new().allocate();
        (EntityRecorder::new(entity), registry, CycleSequencer::new(8, 0))
    }

    #[test]
    fn test_write_then_apply_restores_parts_and_active() {
        let (mut recorder, registry, mut sequencer) = setup();
        let health = recorder.attach(Health(10), &registry);
        let light = recorder.attach(Light { on: true }, &registry);
        assert_eq!(recorder.record_name(light), Some("generic-toggle"));

        sequencer.advance(0).unwrap();
        recorder.record_cycle(RecorderAction::Write, sequencer.index()).unwrap();

        recorder.get_mut::<Health>(health).unwrap().0 = 3;
        recorder.get_mut::<Light>(light).unwrap().on = false;
        recorder.set_active(false);
        sequencer.advance(1).unwrap();
        recorder.record_cycle(RecorderAction::Write, sequencer.index()).unwrap();

        recorder.record_cycle(RecorderAction::Apply(0), sequencer.index()).unwrap();
        assert_eq!(recorder.get::<Health>(health).unwrap().0, 10);
        assert!(recorder.get::<Light>(light).unwrap().on);
        assert!(recorder.is_active());

        recorder.record_cycle(RecorderAction::Apply(1), sequencer.index()).unwrap();
        assert_eq!(recorder.get::<Health>(health).unwrap().0, 3);
        assert!(!recorder.is_active());
    }

    #[test]
    fn test_late_part_is_skipped_for_earlier_cycles() {
        let (mut recorder, registry, mut sequencer) = setup();
        sequencer.advance(0).unwrap();
        recorder.record_cycle(RecorderAction::Write, sequencer.index()).unwrap();

        sequencer.advance(1).unwrap();
        let health = recorder.attach(Health(42), &registry);
        recorder.record_cycle(RecorderAction::Write, sequencer.index()).unwrap();
        assert_eq!(recorder.created_during_cycle(health), Some(1));

        recorder.get_mut::<Health>(health).unwrap().0 = 0;
        recorder.record_cycle(RecorderAction::Apply(0), sequencer.index()).unwrap();
        assert_eq!(recorder.get::<Health>(health).unwrap().0, 0);
    }

    #[test]
    fn test_failing_part_does_not_starve_the_others() {
        let (mut recorder, registry, mut sequencer) = setup();
        let jammed = recorder.attach(Jammed, &registry);
        let health = recorder.attach(Health(10), &registry);

        sequencer.advance(0).unwrap();
        let err = recorder
            .record_cycle(RecorderAction::Write, sequencer.index())
            .unwrap_err();
        assert!(matches!(err, RecordError::State(_)));
        assert!(recorder.has_timeline(jammed));

        recorder.get_mut::<Health>(health).unwrap().0 = 0;
        let err = recorder
            .record_cycle(RecorderAction::Apply(0), sequencer.index())
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::Bounds(BoundsError::Unwritten { cycle: 0 })
        ));
        assert_eq!(recorder.get::<Health>(health).unwrap().0, 10);
    }

    #[test]
    fn test_part_without_timeline_is_skipped() {
        let (mut recorder, registry, mut sequencer) = setup();
        sequencer.advance(0).unwrap();
        recorder.record_cycle(RecorderAction::Write, sequencer.index()).unwrap();

        let health = recorder.attach(Health(5), &registry);
        assert!(!recorder.has_timeline(health));
        recorder.record_cycle(RecorderAction::Apply(0), sequencer.index()).unwrap();
        assert_eq!(recorder.get::<Health>(health).unwrap().0, 5);
    }

    #[test]
    fn test_detach_drops_timeline() {
        let (mut recorder, registry, mut sequencer) = setup();
        let health = recorder.attach(Health(1), &registry);
        sequencer.advance(0).unwrap();
        recorder.record_cycle(RecorderAction::Write, sequencer.index()).unwrap();
        assert!(recorder.has_timeline(health));

        let object = recorder.detach(health).unwrap();
        assert!((*object).as_any().is::<Health>());
        assert!(recorder.part(health).is_none());
        assert!(recorder.detach(health).is_none());
        assert_eq!(recorder.parts().count(), 0);
    }

    #[test]
    fn test_evicted_cycle_is_an_error() {
        let (mut recorder, registry, mut sequencer) = setup();
        recorder.attach(Health(1), &registry);
        for cycle in 0..10 {
            sequencer.advance(cycle).unwrap();
            recorder.record_cycle(RecorderAction::Write, sequencer.index()).unwrap();
        }

        let err = recorder
            .record_cycle(RecorderAction::Apply(0), sequencer.index())
            .unwrap_err();
        assert!(matches!(
            err,
            rewind_record::RecordError::Bounds(BoundsError::Evicted { .. })
        ));
    }

    #[test]
    fn test_action_for_step() {
        assert_eq!(
            RecorderAction::for_step(CycleStep::Applied {
                cycle: 4,
                moved: true
            }),
            RecorderAction::Apply(4)
        );
        assert_eq!(RecorderAction::for_step(CycleStep::Paused), RecorderAction::Idle);
    }
}
