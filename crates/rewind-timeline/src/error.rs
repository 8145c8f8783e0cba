//! Timeline error types.

use thiserror::Error;

use crate::Cycle;

/// A cycle lies outside what a timeline can answer for.
///
/// Never papered over with default data: applying a wrong snapshot would
/// silently corrupt replayed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundsError {
    /// Nothing has been recorded yet.
    #[error("cycle {cycle} requested before anything was recorded")]
    Empty { cycle: Cycle },

    /// The timeline's owner did not exist yet.
    #[error("cycle {cycle} predates the timeline created during cycle {created}")]
    BeforeCreation { cycle: Cycle, created: Cycle },

    /// Overwritten by ring wraparound or evicted from the rewind window.
    #[error("cycle {cycle} was evicted; oldest retained cycle is {oldest}")]
    Evicted { cycle: Cycle, oldest: Cycle },

    /// Not recorded yet, or discarded when history forked.
    #[error("cycle {cycle} is not recorded; newest recorded cycle is {newest}")]
    NotYetRecorded { cycle: Cycle, newest: Cycle },

    /// Inside the window, but this timeline skipped or failed the write.
    #[error("cycle {cycle} was never written to this timeline")]
    Unwritten { cycle: Cycle },
}

/// The ring index fell out of lockstep with the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Fatal: every timeline read after this point could return the wrong
    /// cycle's data.
    #[error("state desync ({what}): clock reports cycle {clock}, ring index reports {index:?}")]
    StateDesync {
        what: &'static str,
        clock: Cycle,
        index: Option<Cycle>,
    },
}

/// Result type for timeline reads.
pub type TimelineResult<T> = Result<T, BoundsError>;
