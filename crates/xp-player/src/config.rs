//! Player configuration.

use std::time::Duration;

/// Tuning for the output scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Output rate for devices that let us choose (the memory device)
    pub sample_rate: u32,
    /// Ring buffer length in frames
    pub buffer_frames: usize,
    /// Frames kept free ahead of the play cursor
    pub safety_margin_frames: usize,
    /// Largest block rendered per scheduler iteration
    pub max_fill_frames: usize,
    /// Sleep between scheduler iterations
    pub poll_interval: Duration,
    /// Sleep between checks while a goto waits for a fade-out
    pub goto_poll_interval: Duration,
    /// How long `play` waits for the worker to open its device
    pub startup_timeout: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_frames: 8192,
            safety_margin_frames: 512,
            max_fill_frames: 2048,
            poll_interval: Duration::from_millis(5),
            goto_poll_interval: Duration::from_millis(5),
            startup_timeout: Duration::from_secs(2),
        }
    }
}

impl PlayerConfig {
    /// Frames the scheduler may keep queued ahead of the play cursor.
    pub fn max_queued_frames(&self) -> usize {
        self.buffer_frames.saturating_sub(self.safety_margin_frames)
    }
}
