//! # Frame Timing
//!
//! Wall-clock delta-time source for the render loop, plus a small rolling
//! window of frame durations used to report FPS and frame-time statistics.
//!
//! ## Usage
//!
//! ```rust
//! use vantage::timing::FrameClock;
//!
//! let mut clock = FrameClock::new();
//! let dt = clock.tick(); // seconds since the previous tick
//! assert!(dt >= 0.0);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Delta assumed for the very first tick, before a previous frame exists
const FIRST_FRAME_DELTA: Duration = Duration::from_millis(16);

/// Rolling frame statistics
#[derive(Debug, Clone)]
pub struct FrameStats {
    /// Frames per second averaged over the sample window
    pub fps: f32,
    /// Average frame time in milliseconds
    pub frame_time_ms: f32,
    /// Minimum frame time in the current window
    pub min_frame_time_ms: f32,
    /// Maximum frame time in the current window
    pub max_frame_time_ms: f32,
    /// Draw calls issued by the last rendered frame
    pub draw_calls: u32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time_ms: 0.0,
            min_frame_time_ms: f32::MAX,
            max_frame_time_ms: 0.0,
            draw_calls: 0,
        }
    }
}

/// Delta-time source for the frame loop
pub struct FrameClock {
    last_tick: Option<Instant>,
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
    samples: VecDeque<Duration>,
    max_samples: usize,
    stats: FrameStats,
}

impl FrameClock {
    /// Create a clock keeping ~2 seconds of samples at 60fps
    pub fn new() -> Self {
        Self::with_window(120)
    }

    /// Create a clock with a custom sample window
    pub fn with_window(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            last_tick: None,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
            stats: FrameStats::default(),
        }
    }

    /// Advance the clock to now and return the delta in seconds
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Advance the clock to `now` and return the delta in seconds
    ///
    /// Instants earlier than the previous tick produce a zero delta.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        self.delta = match self.last_tick {
            Some(last) => now.saturating_duration_since(last),
            None => FIRST_FRAME_DELTA,
        };
        self.last_tick = Some(now);
        self.elapsed += self.delta;
        self.frame_count += 1;

        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(self.delta);
        self.update_stats();

        self.delta.as_secs_f32()
    }

    fn update_stats(&mut self) {
        let total: Duration = self.samples.iter().sum();
        let average_ms = total.as_secs_f32() * 1000.0 / self.samples.len() as f32;

        self.stats.frame_time_ms = average_ms;
        self.stats.fps = if average_ms > 0.0 {
            1000.0 / average_ms
        } else {
            0.0
        };

        if let (Some(min), Some(max)) = (self.samples.iter().min(), self.samples.iter().max()) {
            self.stats.min_frame_time_ms = min.as_secs_f32() * 1000.0;
            self.stats.max_frame_time_ms = max.as_secs_f32() * 1000.0;
        }
    }

    /// Record render statistics for the frame just drawn
    pub fn record_draw_calls(&mut self, draw_calls: u32) {
        self.stats.draw_calls = draw_calls;
    }

    /// Seconds between the two most recent ticks
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Total seconds accumulated across all ticks
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Forget all history; the next tick behaves like the first
    pub fn reset(&mut self) {
        self.last_tick = None;
        self.delta = Duration::ZERO;
        self.elapsed = Duration::ZERO;
        self.frame_count = 0;
        self.samples.clear();
        self.stats = FrameStats::default();
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
