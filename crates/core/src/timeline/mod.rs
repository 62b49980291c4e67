use std::time::{Duration, Instant};

use crate::config::FrameConfig;

/// Wall-clock time since the presentation loop started.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    started: Instant,
}

impl PlaybackClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Keeps the loop near the target frame rate when the presenter does not
/// block on vertical sync.
#[derive(Debug)]
pub struct FramePacer {
    frame_duration: Duration,
    vsync: bool,
    frame_started: Instant,
    frames: u64,
}

impl FramePacer {
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            frame_duration: Duration::from_secs(1) / config.target_fps.max(1),
            vsync: config.vsync,
            frame_started: Instant::now(),
            frames: 0,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Time left in the current frame, zero when running with vsync.
    pub fn remaining(&self) -> Duration {
        if self.vsync {
            return Duration::ZERO;
        }
        self.frame_duration
            .saturating_sub(self.frame_started.elapsed())
    }

    /// Sleeps out the rest of the frame and starts the next one.
    pub fn wait(&mut self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        self.frame_started = Instant::now();
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
