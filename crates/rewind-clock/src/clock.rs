//! The simulation clock and its mode state machine.

use std::collections::VecDeque;

use tracing::{debug, info, trace};

use crate::{ClockConfig, ClockState, ConfigError, Cycle, CycleTime, Mode, TimeSource};

/// What one call to [`SimulationClock::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// The simulation is paused; no cycle was visited.
    Paused,
    /// Frozen, parked, or waiting on an initiated transition; the cursor
    /// stayed on `cycle`.
    Idle { cycle: Cycle },
    /// A new cycle was materialized and must be written.
    Recorded {
        cycle: Cycle,
        /// Oldest cycle still retained after this step.
        oldest_retained: Cycle,
        /// Set when recorded cycles after this one were discarded first.
        forked_after: Option<Cycle>,
    },
    /// The cursor visits a recorded cycle that must be applied.
    Applied {
        cycle: Cycle,
        /// `false` once the cursor has hit the history bound.
        moved: bool,
    },
}

/// Global simulated time source and master mode state machine.
///
/// Per-cycle time records live in a ring that is allocated once with the
/// configured capacity and reused in place for the whole session.
pub struct SimulationClock {
    config: ClockConfig,
    source: Box<dyn TimeSource>,
    mode: Mode,
    frozen: bool,
    paused: bool,
    /// Set on unfreeze; the next boundary runs [`Self::clear_excess_data`].
    clear_pending: bool,
    /// Cycle after which the recorded future was discarded, reported with the
    /// next recorded step.
    pending_fork: Option<Cycle>,
    origin: Cycle,
    capacity: usize,
    state: ClockState,
    /// Time records, oldest first. Front is `state.oldest_recorded_cycle`.
    history: VecDeque<CycleTime>,
}

impl SimulationClock {
    /// Create a clock in `Recording` mode with no history.
    pub fn new(config: ClockConfig, source: impl TimeSource + 'static) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.capacity();

        Ok(Self {
            config,
            source: Box::new(source),
            mode: Mode::Recording,
            frozen: false,
            paused: false,
            clear_pending: false,
            pending_fork: None,
            origin: 0,
            capacity,
            state: ClockState::at_origin(0),
            history: VecDeque::with_capacity(capacity),
        })
    }

    // ==================== Queries ====================

    /// The configuration this clock was built with.
    #[must_use]
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Number of cycles retained at most.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// First cycle of the session.
    #[must_use]
    pub fn origin(&self) -> Cycle {
        self.origin
    }

    /// Full published state.
    #[must_use]
    pub fn state(&self) -> &ClockState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.state.time
    }

    #[must_use]
    pub fn current_delta_time(&self) -> f64 {
        self.state.delta_time
    }

    #[must_use]
    pub fn fixed_time(&self) -> f64 {
        self.state.fixed_time
    }

    #[must_use]
    pub fn fixed_delta_time(&self) -> f64 {
        self.state.fixed_delta_time
    }

    /// Cycle currently being visited.
    #[must_use]
    pub fn cycle_number(&self) -> Cycle {
        self.state.cycle_number
    }

    #[must_use]
    pub fn oldest_recorded_cycle(&self) -> Cycle {
        self.state.oldest_recorded_cycle
    }

    #[must_use]
    pub fn newest_recorded_cycle(&self) -> Cycle {
        self.state.newest_recorded_cycle
    }

    #[must_use]
    pub fn oldest_cycle_within_rewind_limit(&self) -> Cycle {
        self.state.oldest_cycle_within_rewind_limit
    }

    /// Whether any cycle has been recorded since the last reset.
    #[must_use]
    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// Simulated time is frozen, either directly or by a pause.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen || self.paused
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Past state is being applied; gameplay must not mutate shared state.
    #[must_use]
    pub fn is_applying_records(&self) -> bool {
        self.mode.is_applying()
    }

    /// Recorders write the current cycle.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.mode.is_recording()
    }

    /// A rewind request would currently take effect.
    #[must_use]
    pub fn can_rewind(&self) -> bool {
        !self.paused
            && self.frozen
            && !self.mode.is_replay()
            && self.has_history()
            && self.state.cycle_number > self.state.oldest_cycle_within_rewind_limit
    }

    /// A replay request would currently take effect.
    #[must_use]
    pub fn can_replay(&self) -> bool {
        !self.paused
            && self.frozen
            && self.has_history()
            && self.state.cycle_number < self.state.newest_recorded_cycle
    }

    /// Stored time values of a retained cycle.
    #[must_use]
    pub fn cycle_time(&self, cycle: Cycle) -> Option<CycleTime> {
        let offset = cycle.checked_sub(self.state.oldest_recorded_cycle)?;
        self.history.get(offset as usize).copied()
    }

    // ==================== Commands ====================

    /// Freeze or unfreeze simulated time.
    ///
    /// Ignored while paused. Unfreezing stops any rewind or replay and
    /// schedules [`Self::clear_excess_data`] for the next cycle boundary.
    pub fn set_frozen(&mut self, frozen: bool) -> bool {
        if self.paused {
            debug!(frozen, "freeze change ignored while paused");
            return false;
        }
        if self.frozen == frozen {
            return false;
        }

        self.frozen = frozen;
        info!(frozen, cycle = self.state.cycle_number, "time freeze changed");

        if !frozen {
            self.stop_rewind();
            self.stop_replay();
            self.clear_pending = true;
        }
        true
    }

    /// Pause or resume the whole simulation.
    ///
    /// A pause outranks freezing: no cycle is visited and every freeze,
    /// rewind or replay command is ignored until resumed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        if self.paused == paused {
            return false;
        }
        self.paused = paused;
        info!(paused, "simulation pause changed");
        true
    }

    /// Request stepping backward through history.
    pub fn initiate_rewind(&mut self) -> bool {
        if !self.can_rewind() {
            debug!(mode = %self.mode, "rewind request ignored");
            return false;
        }

        match self.mode {
            Mode::Recording => self.set_mode(Mode::RecordingAndRewindInitiated),
            Mode::Flowing => self.set_mode(Mode::RewindInitiated),
            _ => return false,
        }
        true
    }

    /// Stop rewinding. Parks on the visited cycle if time is still frozen.
    pub fn stop_rewind(&mut self) -> bool {
        match self.mode {
            Mode::RecordingAndRewindInitiated => self.set_mode(Mode::Recording),
            Mode::RewindInitiated | Mode::Rewinding => self.park(),
            _ => return false,
        }
        true
    }

    /// Request stepping forward through recorded history.
    pub fn initiate_replay(&mut self) -> bool {
        if !self.can_replay() {
            debug!(mode = %self.mode, "replay request ignored");
            return false;
        }

        match self.mode {
            Mode::Flowing | Mode::RewindInitiated | Mode::Rewinding => {
                self.set_mode(Mode::ReplayInitiated);
            }
            _ => return false,
        }
        true
    }

    /// Stop replaying. Parks on the visited cycle if time is still frozen.
    pub fn stop_replay(&mut self) -> bool {
        match self.mode {
            Mode::ReplayInitiated | Mode::Replaying => self.park(),
            _ => return false,
        }
        true
    }

    /// Move the cursor to a recorded cycle and republish its time values.
    ///
    /// Only honored while rewinding or replaying. Deltas stay at zero because
    /// applying records implies frozen time.
    pub fn set_current_cycle(&mut self, cycle: Cycle) -> bool {
        if !self.mode.is_applying() {
            return false;
        }
        let Some(record) = self.cycle_time(cycle) else {
            debug!(cycle, "cannot visit unretained cycle");
            return false;
        };

        self.state.cycle_number = cycle;
        self.state.time = record.time;
        self.state.fixed_time = record.fixed_time;
        self.state.delta_time = 0.0;
        self.state.fixed_delta_time = 0.0;
        true
    }

    /// Evict time records outside the retained window.
    ///
    /// Drops records older than the rewind limit, and records newer than the
    /// current cycle. The latter is history forking: once recording resumes
    /// from a past cycle, the previously recorded future is gone for good.
    pub fn clear_excess_data(&mut self) {
        self.clear_pending = false;
        if self.history.is_empty() {
            return;
        }

        let limit = self.state.oldest_cycle_within_rewind_limit;
        while self.state.oldest_recorded_cycle < limit && self.history.pop_front().is_some() {
            self.state.oldest_recorded_cycle += 1;
        }

        let cursor = self.state.cycle_number;
        if self.state.newest_recorded_cycle > cursor {
            let keep = (cursor + 1).saturating_sub(self.state.oldest_recorded_cycle) as usize;
            self.history.truncate(keep);
            info!(
                discarded_from = cursor + 1,
                discarded_to = self.state.newest_recorded_cycle,
                "history forked"
            );
            self.state.newest_recorded_cycle = cursor;
            self.pending_fork = Some(cursor);
        }
    }

    /// Discard all history and return to the initial state.
    ///
    /// Time source and configuration are kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.state = ClockState::at_origin(self.origin);
        self.frozen = false;
        self.paused = false;
        self.clear_pending = false;
        self.pending_fork = None;
        self.set_mode(Mode::Recording);
        info!(origin = self.origin, "clock reset");
    }

    // ==================== Cycle ====================

    /// Run one host tick.
    pub fn advance(&mut self) -> CycleStep {
        let elapsed = self.source.elapsed_secs();

        if self.paused {
            self.state.delta_time = 0.0;
            self.state.fixed_delta_time = 0.0;
            return CycleStep::Paused;
        }

        self.cross_boundary();
        if self.clear_pending {
            self.clear_excess_data();
        }

        match self.mode {
            // Frozen time holds the newest cycle instead of spending ring
            // slots on identical zero-delta cycles.
            Mode::Recording if self.frozen && self.has_history() => self.hold(),
            Mode::Recording => self.record_cycle(elapsed),
            Mode::Rewinding => self.step_cursor(false),
            Mode::Replaying => self.step_cursor(true),
            _ => self.hold(),
        }
    }

    fn hold(&mut self) -> CycleStep {
        self.state.delta_time = 0.0;
        self.state.fixed_delta_time = 0.0;
        CycleStep::Idle {
            cycle: self.state.cycle_number,
        }
    }

    fn cross_boundary(&mut self) {
        let next = match self.mode {
            Mode::RewindInitiated | Mode::RecordingAndRewindInitiated if self.frozen => {
                Mode::Rewinding
            }
            Mode::ReplayInitiated if self.frozen => Mode::Replaying,
            Mode::Rewinding | Mode::Replaying | Mode::Flowing if self.frozen => self.mode,
            _ => Mode::Recording,
        };
        self.set_mode(next);
    }

    fn record_cycle(&mut self, elapsed: f64) -> CycleStep {
        if self.has_history() && self.state.newest_recorded_cycle > self.state.cycle_number {
            // Recording resumed on a past cycle without a scheduled clear.
            self.clear_excess_data();
        }

        let cycle = if self.has_history() {
            self.state.cycle_number + 1
        } else {
            self.origin
        };

        let (delta, fixed_delta) = if self.frozen {
            (0.0, 0.0)
        } else {
            (
                self.config.clamp_delta(elapsed),
                self.config.fixed_delta_secs,
            )
        };

        self.state.time += delta;
        self.state.delta_time = delta;
        self.state.fixed_time += fixed_delta;
        self.state.fixed_delta_time = fixed_delta;
        self.state.cycle_number = cycle;
        self.state.newest_recorded_cycle = cycle;

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(self.state.cycle_time());
        self.state.oldest_recorded_cycle = cycle + 1 - self.history.len() as Cycle;
        self.update_rewind_limit();

        trace!(cycle, time = self.state.time, delta, "recorded cycle");

        CycleStep::Recorded {
            cycle,
            oldest_retained: self.state.oldest_recorded_cycle,
            forked_after: self.pending_fork.take(),
        }
    }

    /// Advance `oldest_cycle_within_rewind_limit` until the window holds.
    ///
    /// Recorded times never decrease, so the limit only moves forward while
    /// recording and a forward walk from the previous limit is sufficient.
    fn update_rewind_limit(&mut self) {
        let newest = self.state.newest_recorded_cycle;
        let newest_time = self.state.time;
        let window = self.config.rewind_window_secs;

        let mut limit = self
            .state
            .oldest_cycle_within_rewind_limit
            .max(self.state.oldest_recorded_cycle);
        while limit < newest {
            match self.cycle_time(limit) {
                Some(record) if newest_time - record.time > window => limit += 1,
                _ => break,
            }
        }
        self.state.oldest_cycle_within_rewind_limit = limit;
    }

    fn step_cursor(&mut self, forward: bool) -> CycleStep {
        let cycle = self.state.cycle_number;
        let target = if forward {
            (cycle < self.state.newest_recorded_cycle).then(|| cycle + 1)
        } else {
            (cycle > self.state.oldest_cycle_within_rewind_limit).then(|| cycle - 1)
        };

        self.state.delta_time = 0.0;
        self.state.fixed_delta_time = 0.0;

        let moved = target.is_some_and(|target| self.set_current_cycle(target));
        if !moved {
            trace!(cycle, forward, "history bound reached");
        }

        CycleStep::Applied {
            cycle: self.state.cycle_number,
            moved,
        }
    }

    fn park(&mut self) {
        let parked = self.frozen && self.state.cycle_number < self.state.newest_recorded_cycle;
        if parked {
            self.set_mode(Mode::Flowing);
        } else {
            self.set_mode(Mode::Recording);
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, cycle = self.state.cycle_number, "clock mode changed");
            self.mode = mode;
        }
    }
}

impl std::fmt::Debug for SimulationClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationClock")
            .field("mode", &self.mode)
            .field("frozen", &self.frozen)
            .field("paused", &self.paused)
            .field("state", &self.state)
            .field("retained", &self.history.len())
            .finish_non_exhaustive()
    }
}
