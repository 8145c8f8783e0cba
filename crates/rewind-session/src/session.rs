//! The session: one clock, one ring index, and every recorder, ticked together.

use rewind_clock::{ClockConfig, ConfigError, Cycle, CycleStep, SimulationClock, TimeSource};
use rewind_record::{RecordRegistry, Recordable, SubObject};
use rewind_timeline::{CycleIndex, CycleSequencer};
use tracing::{debug, info, warn};

use crate::{
    Entity, EntityAllocator, EntityRecorder, ForceUpdatePump, PartId, RecorderAction, SessionError,
    SessionResult,
};

/// Ordered sub-phases of one cycle. Recording always runs after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Update,
    /// Skipped on cycles whose fixed delta is zero.
    FixedUpdate,
    LateUpdate,
}

impl Phase {
    pub const ALL: [Self; 3] = [Self::Update, Self::FixedUpdate, Self::LateUpdate];
}

/// What systems see during a phase.
pub struct CycleContext<'a> {
    pub phase: Phase,
    pub clock: &'a mut SimulationClock,
    pub entities: &'a mut ForceUpdatePump,
}

impl CycleContext<'_> {
    /// Gameplay must not mutate recorded state while this is set.
    #[must_use]
    pub fn is_applying_records(&self) -> bool {
        self.clock.is_applying_records()
    }

    #[must_use]
    pub fn delta_time(&self) -> f64 {
        self.clock.current_delta_time()
    }

    #[must_use]
    pub fn fixed_delta_time(&self) -> f64 {
        self.clock.fixed_delta_time()
    }
}

/// Gameplay logic run once per phase per cycle.
pub trait CycleSystem: Send {
    fn run(&mut self, ctx: &mut CycleContext<'_>);
}

impl<F> CycleSystem for F
where
    F: FnMut(&mut CycleContext<'_>) + Send,
{
    fn run(&mut self, ctx: &mut CycleContext<'_>) {
        self(ctx);
    }
}

/// Outcome of one [`Session::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub step: CycleStep,
    pub action: RecorderAction,
    /// Recorders pumped during the record phase.
    pub recorders: usize,
}

/// Explicit context holding all rewind state of one simulation.
///
/// The ring index lives here, not in a global, and every timeline reads
/// through it by reference. [`Session::reset`] discards it together with
/// every timeline built on it.
pub struct Session {
    clock: SimulationClock,
    sequencer: CycleSequencer,
    registry: RecordRegistry,
    entities: EntityAllocator,
    pump: ForceUpdatePump,
    systems: Vec<(Phase, Box<dyn CycleSystem>)>,
    ticks: u64,
}

impl Session {
    pub fn new(config: ClockConfig, source: impl TimeSource + 'static) -> Result<Self, ConfigError> {
        let clock = SimulationClock::new(config, source)?;
        let sequencer = CycleSequencer::new(clock.capacity(), clock.origin());
        info!(
            capacity = clock.capacity(),
            window = clock.config().rewind_window_secs,
            "session created"
        );

        Ok(Self {
            clock,
            sequencer,
            registry: RecordRegistry::new(),
            entities: EntityAllocator::new(),
            pump: ForceUpdatePump::new(),
            systems: Vec::new(),
            ticks: 0,
        })
    }

    // ==================== Accessors ====================

    #[must_use]
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Clock commands (freeze, rewind, replay, pause) go through here.
    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    /// The shared ring index.
    #[must_use]
    pub fn index(&self) -> &CycleIndex {
        self.sequencer.index()
    }

    #[must_use]
    pub fn registry(&self) -> &RecordRegistry {
        &self.registry
    }

    /// Registration affects sub-objects attached afterwards.
    pub fn registry_mut(&mut self) -> &mut RecordRegistry {
        &mut self.registry
    }

    pub fn register<S: Recordable>(&mut self) -> &mut Self {
        self.registry.register::<S>();
        self
    }

    /// Host ticks run so far, including paused ones.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn recorders(&self) -> impl Iterator<Item = &EntityRecorder> {
        self.pump.iter()
    }

    // ==================== Entities ====================

    pub fn spawn(&mut self) -> Entity {
        let entity = self.entities.allocate();
        self.pump.insert(EntityRecorder::new(entity));
        debug!(%entity, "spawned");
        entity
    }

    /// Remove an entity and its history.
    pub fn despawn(&mut self, entity: Entity) -> SessionResult<()> {
        self.pump
            .remove(entity)
            .ok_or(SessionError::UnknownEntity(entity))?;
        self.entities.free(entity);
        debug!(%entity, "despawned");
        Ok(())
    }

    pub fn recorder(&self, entity: Entity) -> SessionResult<&EntityRecorder> {
        self.pump
            .get(entity)
            .ok_or(SessionError::UnknownEntity(entity))
    }

    pub fn recorder_mut(&mut self, entity: Entity) -> SessionResult<&mut EntityRecorder> {
        self.pump
            .get_mut(entity)
            .ok_or(SessionError::UnknownEntity(entity))
    }

    pub fn attach(&mut self, entity: Entity, object: impl SubObject) -> SessionResult<PartId> {
        let recorder = self
            .pump
            .get_mut(entity)
            .ok_or(SessionError::UnknownEntity(entity))?;
        Ok(recorder.attach(object, &self.registry))
    }

    pub fn attach_boxed(&mut self, entity: Entity, object: Box<dyn SubObject>) -> SessionResult<PartId> {
        let recorder = self
            .pump
            .get_mut(entity)
            .ok_or(SessionError::UnknownEntity(entity))?;
        Ok(recorder.attach_boxed(object, &self.registry))
    }

    /// Remove a sub-object; its timeline is dropped with it.
    pub fn detach(&mut self, entity: Entity, part: PartId) -> SessionResult<Box<dyn SubObject>> {
        self.recorder_mut(entity)?
            .detach(part)
            .ok_or(SessionError::UnknownPart { entity, part })
    }

    pub fn get<S: SubObject>(&self, entity: Entity, part: PartId) -> SessionResult<&S> {
        self.recorder(entity)?
            .get(part)
            .ok_or(SessionError::UnknownPart { entity, part })
    }

    pub fn get_mut<S: SubObject>(&mut self, entity: Entity, part: PartId) -> SessionResult<&mut S> {
        self.recorder_mut(entity)?
            .get_mut(part)
            .ok_or(SessionError::UnknownPart { entity, part })
    }

    pub fn set_active(&mut self, entity: Entity, active: bool) -> SessionResult<()> {
        self.recorder_mut(entity)?.set_active(active);
        Ok(())
    }

    // ==================== Systems ====================

    /// Systems of one phase run in insertion order.
    pub fn add_system(&mut self, phase: Phase, system: impl CycleSystem + 'static) -> &mut Self {
        self.systems.push((phase, Box::new(system)));
        self
    }

    // ==================== Cycle ====================

    /// Run one host tick: clock boundary, phases, then recording.
    ///
    /// A [`SessionError::Sequence`] means the ring index fell out of
    /// lockstep with the clock; recorders did not run and the session should
    /// be [`reset`](Self::reset).
    pub fn tick(&mut self) -> SessionResult<TickReport> {
        self.ticks += 1;
        let step = self.clock.advance();

        match step {
            CycleStep::Paused => {
                return Ok(TickReport {
                    tick: self.ticks,
                    step,
                    action: RecorderAction::Idle,
                    recorders: 0,
                });
            }
            CycleStep::Recorded {
                cycle,
                oldest_retained,
                forked_after,
            } => {
                if let Some(after) = forked_after {
                    self.sequencer.fork_after(after);
                }
                self.sequencer.advance(cycle)?;
                self.sequencer.retire_before(oldest_retained);
            }
            CycleStep::Applied { cycle, .. } => self.sequencer.seek(cycle)?,
            CycleStep::Idle { cycle } => {
                if self.clock.has_history() {
                    self.sequencer.seek(cycle)?;
                }
            }
        }
        self.sequencer
            .verify(self.clock.state(), self.clock.has_history())?;

        for phase in Phase::ALL {
            if phase == Phase::FixedUpdate && self.clock.fixed_delta_time() == 0.0 {
                continue;
            }
            let mut ctx = CycleContext {
                phase,
                clock: &mut self.clock,
                entities: &mut self.pump,
            };
            for (_, system) in self.systems.iter_mut().filter(|(p, _)| *p == phase) {
                system.run(&mut ctx);
            }
        }

        let action = match RecorderAction::for_step(step) {
            // A system may have moved the cursor with `set_current_cycle`.
            RecorderAction::Apply(_) if self.clock.is_applying_records() => {
                let cycle = self.clock.cycle_number();
                if cycle != self.sequencer.index().cursor() {
                    self.sequencer.seek(cycle)?;
                }
                RecorderAction::Apply(cycle)
            }
            action => action,
        };

        let recorders = self.pump.pump(self.ticks, action, self.sequencer.index())?;
        Ok(TickReport {
            tick: self.ticks,
            step,
            action,
            recorders,
        })
    }

    /// Run `n` ticks, stopping at the first error.
    pub fn tick_n(&mut self, n: usize) -> SessionResult<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Restore one entity from a retained cycle without moving the clock.
    ///
    /// Fails with the timeline's bounds error for evicted, discarded or
    /// not yet recorded cycles.
    pub fn restore(&mut self, entity: Entity, cycle: Cycle) -> SessionResult<()> {
        let recorder = self
            .pump
            .get_mut(entity)
            .ok_or(SessionError::UnknownEntity(entity))?;
        recorder.record_cycle(RecorderAction::Apply(cycle), self.sequencer.index())?;
        Ok(())
    }

    /// Start over: clock, ring index and every timeline are discarded.
    ///
    /// Entities and their sub-objects stay; they begin new timelines on the
    /// next recorded cycle.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.sequencer.reset(self.clock.origin());
        self.pump.clear_history();
        if !self.pump.is_empty() {
            warn!(entities = self.pump.len(), "session reset dropped recorded history");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("clock", &self.clock)
            .field("index", self.sequencer.index())
            .field("entities", &self.pump)
            .field("systems", &self.systems.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rewind_clock::{ManualTime, Mode};

    use super::*;

    #[derive(Default)]
    struct Counter(u64);

    impl SubObject for Counter {}

    impl Recordable for Counter {
        type Record = u64;

        fn capture(&self, record: &mut u64) {
            *record = self.0;
        }

        fn apply(&mut self, record: &u64) {
            self.0 = *record;
        }
    }

    fn session() -> Session {
        let config = ClockConfig::with_capacity(16, 0.1);
        let mut session = Session::new(config, ManualTime::new(0.1)).unwrap();
        session.register::<Counter>();
        session
    }

    #[test]
    fn test_phases_run_in_order() {
        let mut session = session();
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        for phase in [Phase::LateUpdate, Phase::FixedUpdate, Phase::Update] {
            let order = std::sync::Arc::clone(&order);
            session.add_system(phase, move |ctx: &mut CycleContext<'_>| {
                order.lock().unwrap().push(ctx.phase);
            });
        }

        session.tick().unwrap();
        assert_eq!(
            *order.lock().unwrap(),
            vec![Phase::Update, Phase::FixedUpdate, Phase::LateUpdate]
        );
    }

    #[test]
    fn test_fixed_update_skipped_while_frozen() {
        let mut session = session();
        let fixed_runs = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = std::sync::Arc::clone(&fixed_runs);
        session.add_system(Phase::FixedUpdate, move |_: &mut CycleContext<'_>| {
            counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });

        session.tick().unwrap();
        session.clock_mut().set_frozen(true);
        session.tick().unwrap();

        assert_eq!(fixed_runs.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_system_increments_are_recorded_and_rewound() {
        let mut session = session();
        let entity = session.spawn();
        let part = session.attach(entity, Counter(0)).unwrap();
        session.add_system(Phase::Update, |ctx: &mut CycleContext<'_>| {
            if ctx.is_applying_records() {
                return;
            }
            for recorder in ctx.entities.iter_active_mut() {
                if let Some(counter) = recorder.find_mut::<Counter>() {
                    counter.0 += 1;
                }
            }
        });

        session.tick_n(5).unwrap();
        assert_eq!(session.get::<Counter>(entity, part).unwrap().0, 5);

        session.clock_mut().set_frozen(true);
        assert!(session.clock_mut().initiate_rewind());
        session.tick_n(2).unwrap();
        assert_eq!(session.clock().mode(), Mode::Rewinding);
        assert_eq!(session.clock().cycle_number(), 2);
        assert_eq!(session.get::<Counter>(entity, part).unwrap().0, 3);
    }

    #[test]
    fn test_unknown_entity_and_part() {
        let mut session = session();
        let entity = session.spawn();
        let part = session.attach(entity, Counter(0)).unwrap();
        session.despawn(entity).unwrap();

        assert!(matches!(
            session.get::<Counter>(entity, part),
            Err(SessionError::UnknownEntity(_))
        ));

        let other = session.spawn();
        assert!(matches!(
            session.detach(other, part),
            Err(SessionError::UnknownPart { .. })
        ));
    }

    #[test]
    fn test_paused_tick_touches_nothing() {
        let mut session = session();
        session.spawn();
        session.tick().unwrap();
        session.clock_mut().set_paused(true);

        let report = session.tick().unwrap();
        assert_eq!(report.step, CycleStep::Paused);
        assert_eq!(report.recorders, 0);
        assert_eq!(session.clock().cycle_number(), 0);
    }
}
