//! Clock configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when deriving the ring capacity so that exact multiples
/// (e.g. a 1.25s window over 0.25s ticks) don't round up an extra slot.
const CAPACITY_EPSILON: f64 = 1e-9;

/// Largest ring a configuration may ask for. Every timeline preallocates
/// this many slots, so the bound keeps a typo from aborting on allocation.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Configuration for a [`SimulationClock`](crate::SimulationClock).
///
/// All durations are simulated seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// How far back (in simulated time) history can be rewound.
    pub rewind_window_secs: f64,
    /// Smallest delta a recorded cycle can consume.
    pub min_delta_secs: f64,
    /// Largest delta a recorded cycle can consume.
    pub max_delta_secs: f64,
    /// Step of the physics-equivalent update.
    pub fixed_delta_secs: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            rewind_window_secs: 10.0,
            min_delta_secs: 1.0 / 60.0,
            max_delta_secs: 0.1,
            fixed_delta_secs: 0.02,
        }
    }
}

/// Invalid clock configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A duration was zero, negative, NaN or infinite.
    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The delta clamp range is empty.
    #[error("min_delta_secs ({min}) exceeds max_delta_secs ({max})")]
    InvertedDeltaRange {
        /// Configured minimum delta.
        min: f64,
        /// Configured maximum delta.
        max: f64,
    },

    /// The rewind window needs more slots than [`MAX_CAPACITY`].
    #[error("rewind window needs {cycles} cycles; at most {max} are supported")]
    CapacityTooLarge {
        /// Cycles the window would need, `ceil(window / min_delta)`.
        cycles: f64,
        /// [`MAX_CAPACITY`].
        max: usize,
    },
}

impl ClockConfig {
    /// Config whose derived [`capacity`](Self::capacity) is exactly `capacity`
    /// cycles of `min_delta_secs` each.
    #[must_use]
    pub fn with_capacity(capacity: usize, min_delta_secs: f64) -> Self {
        Self {
            rewind_window_secs: capacity as f64 * min_delta_secs,
            min_delta_secs,
            max_delta_secs: min_delta_secs.max(Self::default().max_delta_secs),
            ..Self::default()
        }
    }

    /// Set the rewind window.
    #[must_use]
    pub fn rewind_window(mut self, secs: f64) -> Self {
        self.rewind_window_secs = secs;
        self
    }

    /// Set the fixed update step.
    #[must_use]
    pub fn fixed_delta(mut self, secs: f64) -> Self {
        self.fixed_delta_secs = secs;
        self
    }

    /// Check that every duration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("rewind_window_secs", self.rewind_window_secs),
            ("min_delta_secs", self.min_delta_secs),
            ("max_delta_secs", self.max_delta_secs),
            ("fixed_delta_secs", self.fixed_delta_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if self.min_delta_secs > self.max_delta_secs {
            return Err(ConfigError::InvertedDeltaRange {
                min: self.min_delta_secs,
                max: self.max_delta_secs,
            });
        }

        let cycles = (self.rewind_window_secs / self.min_delta_secs - CAPACITY_EPSILON).ceil();
        if cycles > MAX_CAPACITY as f64 {
            return Err(ConfigError::CapacityTooLarge {
                cycles,
                max: MAX_CAPACITY,
            });
        }

        Ok(())
    }

    /// Number of cycles a timeline must hold to cover the rewind window.
    ///
    /// `ceil(rewind_window / min_delta)`, never less than one.
    #[must_use]
    pub fn capacity(&self) -> usize {
        let cycles = (self.rewind_window_secs / self.min_delta_secs - CAPACITY_EPSILON).ceil();
        (cycles as usize).max(1)
    }

    /// Clamp a real elapsed duration into the allowed delta range.
    #[must_use]
    pub fn clamp_delta(&self, elapsed_secs: f64) -> f64 {
        if elapsed_secs.is_nan() {
            return self.min_delta_secs;
        }
        elapsed_secs.clamp(self.min_delta_secs, self.max_delta_secs)
    }
}
