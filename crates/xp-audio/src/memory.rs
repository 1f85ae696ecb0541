//! In-memory ring device for tests and headless runs.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::traits::{split_region, AudioError, Cursors, PcmFormat, RingDevice};

/// How the play cursor moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryClock {
    /// Follows wall-clock time at the format's sample rate
    Realtime,
    /// Moves only when [`MemoryProbe::advance`] is called
    Manual,
}

/// Counters shared between a [`MemoryDevice`] and its probes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Frames written through `lock_region`
    pub frames_written: u64,
    /// Written frames with a non-zero channel
    pub audible_frames: u64,
    /// Largest absolute sample value written
    pub peak: u16,
    pub running: bool,
    pub starts: u32,
    pub stops: u32,
    /// Lock requests refused because of `fail_next_locks`
    pub failed_locks: u32,
}

#[derive(Debug, Default)]
struct Shared {
    stats: MemoryStats,
    /// Lock requests left to refuse
    fail_locks: u32,
    /// Frames played under the manual clock
    manual_frames: u64,
}

/// Observer and fault injector for a [`MemoryDevice`] living on another
/// thread.
#[derive(Clone, Debug, Default)]
pub struct MemoryProbe {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryProbe {
    pub fn stats(&self) -> MemoryStats {
        self.shared.lock().stats.clone()
    }

    /// Refuse the next `n` lock requests.
    pub fn fail_next_locks(&self, n: u32) {
        self.shared.lock().fail_locks = n;
    }

    /// Move a manual clock forward by `frames`.
    pub fn advance(&self, frames: u64) {
        self.shared.lock().manual_frames += frames;
    }
}

/// A ring buffer with a simulated play cursor and no audio output.
pub struct MemoryDevice {
    format: PcmFormat,
    ring: Vec<u8>,
    clock: MemoryClock,
    started_at: Option<Instant>,
    /// Frames played before the last stop (realtime clock)
    played: u64,
    shared: Arc<Mutex<Shared>>,
}

impl MemoryDevice {
    pub fn new(format: PcmFormat, buffer_frames: usize, clock: MemoryClock) -> Self {
        Self {
            format,
            ring: vec![0; format.frames_to_bytes(buffer_frames.max(1))],
            clock,
            started_at: None,
            played: 0,
            shared: Arc::default(),
        }
    }

    /// A probe observing this device.
    pub fn probe(&self) -> MemoryProbe {
        MemoryProbe { shared: self.shared.clone() }
    }

    /// Contents of the ring.
    pub fn ring(&self) -> &[u8] {
        &self.ring
    }

    fn frames_played(&self) -> u64 {
        match self.clock {
            MemoryClock::Manual => self.shared.lock().manual_frames,
            MemoryClock::Realtime => {
                let running = self.started_at.map_or(0, |t| {
                    (t.elapsed().as_micros() * self.format.sample_rate as u128 / 1_000_000)
                        as u64
                });
                self.played + running
            }
        }
    }
}

fn record(stats: &mut MemoryStats, bytes: &[u8]) {
    for frame in bytes.chunks_exact(4) {
        let left = i16::from_le_bytes([frame[0], frame[1]]);
        let right = i16::from_le_bytes([frame[2], frame[3]]);
        stats.frames_written += 1;
        if left != 0 || right != 0 {
            stats.audible_frames += 1;
        }
        stats.peak = stats.peak.max(left.unsigned_abs()).max(right.unsigned_abs());
    }
}

impl RingDevice for MemoryDevice {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn buffer_bytes(&self) -> usize {
        self.ring.len()
    }

    fn cursors(&self) -> Result<Cursors, AudioError> {
        let play = (self.format.frames_to_bytes(1) as u64 * self.frames_played()
            % self.ring.len() as u64) as usize;
        Ok(Cursors { play, write: play })
    }

    fn lock_region(
        &mut self,
        offset: usize,
        len: usize,
        fill: &mut dyn FnMut(&mut [u8], &mut [u8]),
    ) -> Result<(), AudioError> {
        let mut shared = self.shared.lock();
        if shared.fail_locks > 0 {
            shared.fail_locks -= 1;
            shared.stats.failed_locks += 1;
            return Err(AudioError::LockFailed);
        }
        let (first, second) = split_region(&mut self.ring, offset, len)?;
        fill(first, second);
        record(&mut shared.stats, first);
        record(&mut shared.stats, second);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        let mut shared = self.shared.lock();
        shared.stats.running = true;
        shared.stats.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if self.clock == MemoryClock::Realtime {
            self.played = self.frames_played();
        }
        self.started_at = None;
        let mut shared = self.shared.lock();
        shared.stats.running = false;
        shared.stats.stops += 1;
        Ok(())
    }
}
