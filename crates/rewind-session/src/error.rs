//! Session error types.

use rewind_record::RecordError;
use rewind_timeline::SequenceError;
use thiserror::Error;

use crate::{Entity, PartId};

/// Failure while driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The ring index and the clock disagree. Fatal for the session.
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("unknown entity {0}")]
    UnknownEntity(Entity),

    #[error("entity {entity} has no {part}")]
    UnknownPart { entity: Entity, part: PartId },

    /// An entity's recorder was asked to run twice in one tick.
    #[error("entity {entity} already recorded during tick {tick}")]
    DuplicateTick { entity: Entity, tick: u64 },
}

impl SessionError {
    /// The session can no longer trust its recorded history.
    #[must_use]
    pub fn is_desync(&self) -> bool {
        matches!(self, Self::Sequence(SequenceError::StateDesync { .. }))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
