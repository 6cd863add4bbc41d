//! Frame clock for time-integrated input

use std::time::Instant;

/// Longest gap fed to integration; longer stalls are clamped to this
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Tracks time between frames
pub struct FrameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock. Call once per frame; returns the new delta.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.delta_time = 0.0;
            return 0.0;
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed)
    }

    /// Forget time spent idle so the next tick does not jump
    pub fn reset(&mut self) {
        self.first_tick = true;
    }

    fn advance(&mut self, elapsed: f64) -> f64 {
        self.delta_time = elapsed.clamp(0.0, MAX_FRAME_TIME);
        self.total_time += self.delta_time;
        self.delta_time
    }
}
