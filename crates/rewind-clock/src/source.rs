//! Real-time sources feeding the simulated clock.

use std::time::Instant;

/// Supplies the real time elapsed between host ticks.
pub trait TimeSource: Send {
    /// Seconds of real time since the previous call.
    fn elapsed_secs(&mut self) -> f64;
}

/// Monotonic wall clock.
#[derive(Debug)]
pub struct WallClock {
    last: Instant,
}

impl WallClock {
    /// Start measuring from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn elapsed_secs(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed.as_secs_f64()
    }
}

/// Deterministic source that reports a fixed step on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualTime {
    step: f64,
}

impl ManualTime {
    /// Report `step` seconds per tick.
    #[must_use]
    pub const fn new(step: f64) -> Self {
        Self { step }
    }

    /// Change the reported step.
    pub fn set_step(&mut self, step: f64) {
        self.step = step;
    }
}

impl TimeSource for ManualTime {
    fn elapsed_secs(&mut self) -> f64 {
        self.step
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn elapsed_secs(&mut self) -> f64 {
        (**self).elapsed_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_is_fixed() {
        let mut time = ManualTime::new(0.25);
        assert_eq!(time.elapsed_secs(), 0.25);
        assert_eq!(time.elapsed_secs(), 0.25);

        time.set_step(0.5);
        assert_eq!(time.elapsed_secs(), 0.5);
    }

    #[test]
    fn test_wall_clock_is_monotonic() {
        let mut clock = WallClock::new();
        let first = clock.elapsed_secs();
        let second = clock.elapsed_secs();
        assert!(first >= 0.0);
        assert!(second >= 0.0);
    }
}
