//! Frame clock for the animation driver.
//!
//! The simulation only sees a delta time per frame. [`Time`] measures it from
//! the wall clock as the gap between two redraws.
//!
//! ```ignore
//! let mut time = Time::new();
//!
//! // once per redraw
//! let dt = time.update();
//! simulation.render_frame(&ctx, &mut encoder, &view, &FrameInput { dt, pointer })?;
//! ```

use std::time::{Duration, Instant};

const FPS_WINDOW: Duration = Duration::from_millis(500);

/// Frames-per-second averaged over [`FPS_WINDOW`].
#[derive(Debug, Clone, Copy)]
struct FpsCounter {
    window_start: Instant,
    frames_in_window: u32,
    value: f32,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames_in_window: 0,
            value: 0.0,
        }
    }

    fn tick(&mut self, now: Instant) {
        self.frames_in_window += 1;
        let span = now.duration_since(self.window_start);
        if span >= FPS_WINDOW {
            self.value = self.frames_in_window as f32 / span.as_secs_f32();
            self.frames_in_window = 0;
            self.window_start = now;
        }
    }
}

/// Wall-clock frame timing.
#[derive(Debug)]
pub struct Time {
    previous: Instant,
    delta: f32,
    elapsed: f32,
    frames: u64,
    fps: FpsCounter,
    fixed_delta: Option<f32>,
}

impl Time {
    /// Start a clock at the current instant.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            previous: now,
            delta: 0.0,
            elapsed: 0.0,
            frames: 0,
            fps: FpsCounter::new(now),
            fixed_delta: None,
        }
    }

    /// Advance by one frame and return its delta in seconds.
    ///
    /// Deltas are not clamped: a stalled frame produces one large delta.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let measured = now.duration_since(self.previous).as_secs_f32();
        self.previous = now;

        self.delta = self.fixed_delta.unwrap_or(measured);
        self.elapsed += self.delta;
        self.frames += 1;
        self.fps.tick(now);

        self.delta
    }

    /// Sum of every delta returned so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Delta of the last frame.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Number of `update` calls.
    pub fn frame(&self) -> u64 {
        self.frames
    }

    /// Frames per second over the last completed half-second window.
    pub fn fps(&self) -> f32 {
        self.fps.value
    }

    /// Report `delta` every frame instead of the measured time, or `None` to
    /// go back to the wall clock.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
