//! Forced per-cycle scheduling of entity recorders.

use rewind_timeline::CycleIndex;
use tracing::trace;

use crate::{Entity, EntityRecorder, RecorderAction, SessionError, SessionResult};

struct Slot {
    recorder: EntityRecorder,
    last_tick: Option<u64>,
}

/// Owns every entity recorder and runs each exactly once per tick.
///
/// Inactive entities are pumped like active ones. Skipping them would leave
/// a gap in their timelines that a later rewind would fill with stale data.
#[derive(Default)]
pub struct ForceUpdatePump {
    slots: Vec<Option<Slot>>,
}

impl ForceUpdatePump {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a recorder, replacing any recorder in the same slot.
    pub fn insert(&mut self, recorder: EntityRecorder) {
        let slot = recorder.entity().slot();
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(Slot {
            recorder,
            last_tick: None,
        });
    }

    pub fn remove(&mut self, entity: Entity) -> Option<EntityRecorder> {
        let slot = self.slots.get_mut(entity.slot())?;
        if slot.as_ref()?.recorder.entity() != entity {
            return None;
        }
        slot.take().map(|slot| slot.recorder)
    }

    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&EntityRecorder> {
        self.slots
            .get(entity.slot())?
            .as_ref()
            .map(|slot| &slot.recorder)
            .filter(|recorder| recorder.entity() == entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecorder> {
        self.slots
            .get_mut(entity.slot())?
            .as_mut()
            .map(|slot| &mut slot.recorder)
            .filter(|recorder| recorder.entity() == entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRecorder> {
        self.slots.iter().flatten().map(|slot| &slot.recorder)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityRecorder> {
        self.slots.iter_mut().flatten().map(|slot| &mut slot.recorder)
    }

    /// Recorders of active entities, for gameplay systems.
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut EntityRecorder> {
        self.iter_mut().filter(|recorder| recorder.is_active())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `action` on every recorder for host tick `tick`.
    ///
    /// Returns how many recorders ran. Every recorder runs even when one
    /// fails; the first failure is returned afterwards. Pumping a tick twice
    /// fails with [`SessionError::DuplicateTick`] before anything runs.
    pub fn pump(&mut self, tick: u64, action: RecorderAction, index: &CycleIndex) -> SessionResult<usize> {
        if let Some(slot) = self.slots.iter().flatten().find(|slot| slot.last_tick == Some(tick)) {
            return Err(SessionError::DuplicateTick {
                entity: slot.recorder.entity(),
                tick,
            });
        }

        let mut pumped = 0;
        let mut failed = 0;
        let mut first_error = None;
        for slot in self.slots.iter_mut().flatten() {
            slot.last_tick = Some(tick);
            if let Err(err) = slot.recorder.record_cycle(action, index) {
                failed += 1;
                first_error.get_or_insert(err);
            }
            pumped += 1;
        }

        trace!(tick, ?action, pumped, failed, "pumped recorders");
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(pumped),
        }
    }

    /// Drop the timelines of every recorder.
    pub fn clear_history(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.recorder.clear_history();
            slot.last_tick = None;
        }
    }
}

impl std::fmt::Debug for ForceUpdatePump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(EntityRecorder::entity)).finish()
    }
}
