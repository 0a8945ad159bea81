//! Wall-clock time source for windowed runs.

use std::time::{Duration, Instant};

/// Measures time between successive ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    max_delta: Option<Duration>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            max_delta: None,
        }
    }

    /// Caps the delta returned by [`FrameClock::delta`], e.g. after the
    /// window was dragged or the process was suspended.
    #[must_use]
    pub fn with_max_delta(mut self, max_delta: Duration) -> Self {
        self.max_delta = Some(max_delta);
        self
    }

    /// Seconds since the previous call (or since construction).
    pub fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let mut delta = now.duration_since(self.last);
        self.last = now;
        if let Some(max) = self.max_delta {
            delta = delta.min(max);
        }
        delta.as_secs_f32()
    }

    /// Seconds since construction.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
