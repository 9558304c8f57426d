// ============================================================================
// time.rs — GpuFlock
// Frame timing (smoothed delta, FPS) and the fixed physics-step accumulator.
// ============================================================================

use std::time::Instant;

/// Longest frame delta accepted; anything slower is treated as this.
const MAX_FRAME_DELTA: f32 = 1.0 / 3.0;

/// Per-frame timing. The smoothed delta is what the kernel integrates with,
/// so a single slow frame does not throw the flock forward.
pub struct FrameClock {
    last: Instant,
    smoothed_delta: f32,
    fps: f32,
    frames: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            smoothed_delta: 1.0 / 60.0,
            fps: 0.0,
            frames: 0,
        }
    }

    /// Measure the wall-clock delta since the previous tick and record it.
    /// Returns the raw (clamped) delta.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        self.advance(raw)
    }

    /// Record a frame that took `raw` seconds. Returns the clamped delta.
    pub fn advance(&mut self, raw: f32) -> f32 {
        let dt = raw.clamp(1e-4, MAX_FRAME_DELTA);
        self.smoothed_delta = self.smoothed_delta * 0.9 + dt * 0.1;
        self.fps = self.fps * 0.95 + (1.0 / dt) * 0.05;
        self.frames += 1;
        dt
    }

    pub fn smoothed_delta(&self) -> f32 {
        self.smoothed_delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Turns variable frame deltas into a whole number of fixed steps.
pub struct FixedTimestep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step: step.max(1e-4),
            max_steps: max_steps.max(1),
            accumulator: 0.0,
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Add `dt` and return how many fixed steps are now due (possibly 0).
    /// Time beyond `max_steps` steps is dropped.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let due = (self.accumulator / self.step).floor() as u32;
        if due > self.max_steps {
            self.accumulator = 0.0;
            return self.max_steps;
        }
        self.accumulator -= due as f32 * self.step;
        due
    }
}
