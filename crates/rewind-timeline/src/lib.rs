//! Cycle timelines: bounded, in-place-reused snapshot history.
//!
//! Every recordable sub-object owns one [`CycleTimeline`]. Timelines don't tag
//! their slots with cycle numbers; instead all of them translate cycles to
//! slots through one shared [`CycleIndex`], which the [`CycleSequencer`]
//! advances exactly once per recorded cycle.
//!
//! ```text
//!             CycleSequencer ── advance(cycle) ──▶ CycleIndex
//!                                                     │ slot_of(cycle)
//!        ┌────────────────────────┬───────────────────┴──────┐
//!        ▼                        ▼                          ▼
//!  CycleTimeline<A>         CycleTimeline<B>           CycleTimeline<C>
//!  [a0 a1 a2 a3 a4]         [b0 b1 b2 b3 b4]           [c0 c1 c2 c3 c4]
//! ```
//!
//! That only works while every timeline moves in lockstep with the index,
//! and while the index moves in lockstep with the clock. The sequencer
//! checks the latter on every cycle and reports [`SequenceError::StateDesync`]
//! instead of letting the two drift.

mod error;
mod index;
mod sequencer;
mod timeline;

pub use error::{BoundsError, SequenceError, TimelineResult};
pub use index::CycleIndex;
pub use rewind_clock::Cycle;
pub use sequencer::CycleSequencer;
pub use timeline::CycleTimeline;
