// ABOUTME: Frame timing for the simulation and shaders.
// ABOUTME: Tracks elapsed session time and the clamped per-frame delta.

use std::time::{Duration, Instant};

use crate::step::MAX_DELTA_TIME;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Seconds since the clock started
    pub elapsed: f32,
    /// Seconds since the previous tick, at most `MAX_DELTA_TIME`
    pub delta: f32,
}

pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start, last: start }
    }

    pub fn tick(&mut self) -> FrameTiming {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTiming {
        let raw = now.saturating_duration_since(self.last);
        self.last = now;
        FrameTiming {
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            delta: clamp_delta(raw),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

pub fn clamp_delta(raw: Duration) -> f32 {
    raw.as_secs_f32().min(MAX_DELTA_TIME)
}
