//! Record error types.

use rewind_timeline::BoundsError;
use thiserror::Error;

/// Failure while capturing or applying a record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The requested cycle is outside the timeline.
    #[error(transparent)]
    Bounds(#[from] BoundsError),

    /// A chain step was handed a sub-object of a different type.
    #[error("record type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Generic state could not be encoded or decoded.
    #[error("state codec failed: {0}")]
    Codec(#[from] bincode::Error),

    /// A sub-object's own state hook refused to save or load.
    #[error("state hook failed: {0}")]
    State(String),
}

impl RecordError {
    /// The cycle predates the owning sub-object; callers skip these.
    #[must_use]
    pub fn is_before_creation(&self) -> bool {
        matches!(self, Self::Bounds(BoundsError::BeforeCreation { .. }))
    }
}

/// Result type for record operations.
pub type RecordResult<T> = Result<T, RecordError>;
