//! Output scheduler: the background thread that keeps the device ring fed.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use xp_audio::{AudioError, RingDevice};
use xp_engine::{Engine, Frame};

use crate::config::PlayerConfig;
use crate::state::{EngineState, PlaybackPosition};

/// Engine slot shared by the control surface and the worker.
pub type SharedEngine = Arc<Mutex<Option<Engine>>>;

/// Ring bookkeeping in frames, independent of any device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingTracker {
    /// Ring length in frames
    len: usize,
    /// Next frame to write
    write_pos: usize,
    /// Play cursor seen on the previous poll
    last_play: usize,
    /// Frames written but not yet played
    queued: usize,
}

impl RingTracker {
    pub fn new(len: usize, play: usize) -> Self {
        Self { len: len.max(1), write_pos: play, last_play: play, queued: 0 }
    }

    /// Account for the play cursor moving to `play`. Returns true if the
    /// device ran past the written data, in which case writing resumes
    /// at `safe_write`.
    pub fn observe(&mut self, play: usize, safe_write: usize) -> bool {
        let played = (play + self.len - self.last_play) % self.len;
        self.last_play = play;
        if played > self.queued {
            self.write_pos = safe_write % self.len;
            self.queued = (self.write_pos + self.len - play) % self.len;
            return true;
        }
        self.queued -= played;
        false
    }

    /// Frames that can be written while keeping `max_queued` in flight.
    pub fn headroom(&self, max_queued: usize) -> usize {
        max_queued.saturating_sub(self.queued)
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub fn queued(&self) -> usize {
        self.queued
    }

    pub fn commit(&mut self, frames: usize) {
        self.write_pos = (self.write_pos + frames) % self.len;
        self.queued += frames;
    }
}

/// Everything the worker thread owns.
pub struct Scheduler {
    device: Box<dyn RingDevice>,
    engine: SharedEngine,
    state: Arc<EngineState>,
    config: PlayerConfig,
    ring: RingTracker,
    /// Rendered frames waiting for the device
    scratch: Vec<Frame>,
    /// Frames at the front of `scratch` not yet written
    pending: usize,
    bytes_per_frame: usize,
    last_poll: Instant,
}

impl Scheduler {
    pub fn new(
        device: Box<dyn RingDevice>,
        engine: SharedEngine,
        state: Arc<EngineState>,
        config: PlayerConfig,
    ) -> Result<Self, AudioError> {
        let format = device.format();
        let bytes_per_frame = format.bytes_per_frame();
        let len = device.buffer_bytes() / bytes_per_frame;
        let play = device.cursors()?.play / bytes_per_frame;
        let scratch = vec![Frame::silence(); config.max_fill_frames.max(1)];
        Ok(Self {
            device,
            engine,
            state,
            config,
            ring: RingTracker::new(len, play),
            scratch,
            pending: 0,
            bytes_per_frame,
            last_poll: Instant::now(),
        })
    }

    /// Loop until a stop is requested, then stop the device.
    pub fn run(mut self) {
        if let Err(err) = self.device.start() {
            warn!(%err, "device start failed");
        }
        info!("scheduler started");

        while !self.state.stop_requested() {
            self.iterate();
            std::thread::sleep(self.config.poll_interval);
        }

        if let Err(err) = self.device.stop() {
            warn!(%err, "device stop failed");
        }
        self.state.set_playing(false);
        info!("scheduler stopped");
    }

    /// One fill cycle. Device errors skip the cycle.
    pub fn iterate(&mut self) {
        let now = Instant::now();
        let gain = self.state.step_gain(now - self.last_poll);
        self.last_poll = now;

        let cursors = match self.device.cursors() {
            Ok(c) => c,
            Err(err) => {
                warn!(%err, "cursor query failed, retrying");
                return;
            }
        };
        let play = cursors.play / self.bytes_per_frame;
        if self.ring.observe(play, cursors.write / self.bytes_per_frame) {
            debug!(play, write_pos = self.ring.write_pos(), "underrun, resynced");
        }

        if self.pending == 0 {
            let frames = self
                .ring
                .headroom(self.config.max_queued_frames())
                .min(self.scratch.len());
            if frames == 0 {
                return;
            }
            self.render(frames, gain);
            self.pending = frames;
        }

        let frames = self.pending.min(self.ring.headroom(self.config.max_queued_frames()));
        if frames == 0 {
            return;
        }
        match self.write(frames) {
            Ok(()) => {
                self.ring.commit(frames);
                self.scratch.copy_within(frames..self.pending, 0);
                self.pending -= frames;
            }
            Err(err) => warn!(%err, "ring lock failed, retrying"),
        }
    }

    fn render(&mut self, frames: usize, gain: i32) {
        let out = &mut self.scratch[..frames];
        if self.state.is_paused() {
            out.fill(Frame::silence());
            return;
        }

        let mut slot = self.engine.lock();
        let Some(engine) = slot.as_mut() else {
            out.fill(Frame::silence());
            return;
        };
        engine.set_master_volume(gain);

        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| engine.render(out));
        #[cfg(not(feature = "alloc_check"))]
        engine.render(out);

        let pos = engine.position();
        let pattern = engine.module().header.pattern_at(pos.sequence as usize);
        self.state.publish_position(PlaybackPosition {
            sequence: pos.sequence,
            pattern,
            row: pos.row,
        });
    }

    fn write(&mut self, frames: usize) -> Result<(), AudioError> {
        let offset = self.ring.write_pos() * self.bytes_per_frame;
        let len = frames * self.bytes_per_frame;
        let source = &self.scratch[..frames];
        let bytes_per_frame = self.bytes_per_frame;
        self.device.lock_region(offset, len, &mut |first, second| {
            let split = first.len() / bytes_per_frame;
            copy_frames(&source[..split], first, bytes_per_frame);
            copy_frames(&source[split..], second, bytes_per_frame);
        })
    }
}

fn copy_frames(frames: &[Frame], bytes: &mut [u8], bytes_per_frame: usize) {
    for (frame, out) in frames.iter().zip(bytes.chunks_exact_mut(bytes_per_frame)) {
        let encoded = frame.to_le_bytes();
        let n = encoded.len().min(out.len());
        out[..n].copy_from_slice(&encoded[..n]);
    }
}
