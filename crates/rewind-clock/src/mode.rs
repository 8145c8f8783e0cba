//! Clock operating modes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The clock's mutually exclusive operating modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Parked on a past cycle: nothing is written or applied.
    Flowing,
    /// Each cycle is written to history.
    #[default]
    Recording,
    /// Rewind requested from `Flowing`; starts at the next cycle boundary.
    RewindInitiated,
    /// Rewind requested mid-cycle while recording. The current cycle is
    /// still written, rewinding starts at the next boundary.
    RecordingAndRewindInitiated,
    /// Stepping backward through history, applying each visited cycle.
    Rewinding,
    /// Replay requested; starts at the next cycle boundary.
    ReplayInitiated,
    /// Stepping forward through history, applying each visited cycle.
    Replaying,
}

impl Mode {
    /// Whether recorders write the current cycle.
    #[must_use]
    pub const fn is_recording(self) -> bool {
        matches!(self, Self::Recording | Self::RecordingAndRewindInitiated)
    }

    /// Whether recorders apply past cycles.
    #[must_use]
    pub const fn is_applying(self) -> bool {
        matches!(self, Self::Rewinding | Self::Replaying)
    }

    /// Whether this mode belongs to the rewind side of the machine.
    #[must_use]
    pub const fn is_rewind(self) -> bool {
        matches!(
            self,
            Self::RewindInitiated | Self::RecordingAndRewindInitiated | Self::Rewinding
        )
    }

    /// Whether this mode belongs to the replay side of the machine.
    #[must_use]
    pub const fn is_replay(self) -> bool {
        matches!(self, Self::ReplayInitiated | Self::Replaying)
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Flowing => "flowing",
            Self::Recording => "recording",
            Self::RewindInitiated => "rewind-initiated",
            Self::RecordingAndRewindInitiated => "recording-and-rewind-initiated",
            Self::Rewinding => "rewinding",
            Self::ReplayInitiated => "replay-initiated",
            Self::Replaying => "replaying",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
