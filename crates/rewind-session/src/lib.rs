//! Session driver for the rewind runtime.
//!
//! A [`Session`] is the explicit context tying together one
//! [`SimulationClock`](rewind_clock::SimulationClock), one
//! [`CycleSequencer`](rewind_timeline::CycleSequencer) and every entity's
//! [`EntityRecorder`]. Each host tick runs:
//!
//! ```text
//! clock.advance() ─▶ sequencer (advance | seek) ─▶ verify lockstep
//!       │
//!       ▼
//! Update ─▶ FixedUpdate ─▶ LateUpdate ─▶ ForceUpdatePump (write | apply | idle)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new(ClockConfig::default(), WallClock::new())?;
//! session.register::<Transform>();
//!
//! let player = session.spawn();
//! session.attach(player, Transform::default())?;
//!
//! loop {
//!     session.tick()?;
//! }
//! ```

mod entity;
mod error;
mod pump;
mod recorder;
mod session;

pub use entity::{Entity, EntityAllocator};
pub use error::{SessionError, SessionResult};
pub use pump::ForceUpdatePump;
pub use recorder::{EntityRecorder, PartId, RecorderAction};
pub use session::{CycleContext, CycleSystem, Phase, Session, TickReport};
