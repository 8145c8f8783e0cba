//! Simulated clock for the rewind runtime.
//!
//! The clock is the master time source of a session. Once per host tick it
//! either materializes a new cycle (recording), steps a cursor through
//! already-recorded cycles (rewinding/replaying), or holds still (paused or
//! parked on a past cycle).
//!
//! # Mode state machine
//!
//! ```text
//!              freeze + rewind                  boundary, still frozen
//! Recording ───────────────▶ RecordingAndRewindInitiated ─────────────▶ Rewinding
//!     ▲                                                                 │   ▲
//!     │ unfreeze (forks history)                       replay request   │   │
//!     │                                                                 ▼   │
//!  Flowing ◀──────── stop while frozen ──────────── ReplayInitiated ──▶ Replaying
//! ```
//!
//! - **Recording**: every cycle is written. While frozen the cursor holds on
//!   the newest cycle, so a long freeze doesn't evict earlier history.
//! - **Rewinding / Replaying**: the cursor moves one cycle per tick, clamped
//!   to the rewind window and the newest recorded cycle.
//! - **Flowing**: parked on a past cycle after a stop; nothing is written or
//!   applied until time is unfrozen, which discards the recorded future.
//!
//! # Usage
//!
//! ```ignore
//! use rewind_clock::{ClockConfig, ManualTime, SimulationClock};
//!
//! let mut clock = SimulationClock::new(ClockConfig::default(), ManualTime::new(1.0 / 60.0))?;
//! for _ in 0..120 {
//!     clock.advance();
//! }
//! clock.set_frozen(true);
//! clock.initiate_rewind();
//! ```

mod clock;
mod config;
mod mode;
mod source;
mod state;

pub use clock::{CycleStep, SimulationClock};
pub use config::{ClockConfig, ConfigError, MAX_CAPACITY};
pub use mode::Mode;
pub use source::{ManualTime, TimeSource, WallClock};
pub use state::{ClockState, CycleTime};

/// A simulated cycle identifier.
///
/// Cycles only ever increase while recording; rewinding re-visits existing
/// cycles instead of creating new ones.
pub type Cycle = u64;
