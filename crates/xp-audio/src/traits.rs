//! Ring-buffer output device trait and error types.

use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
    /// The ring buffer could not be locked for writing
    #[error("ring buffer lock failed")]
    LockFailed,
    /// A lock request fell outside the ring buffer
    #[error("region {offset}+{len} outside ring of {size} bytes")]
    BadRegion { offset: usize, len: usize, size: usize },
}

/// Fixed PCM layout of a ring buffer: interleaved signed 16-bit stereo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// 16-bit stereo at `sample_rate`.
    pub const fn stereo16(sample_rate: u32) -> Self {
        Self { sample_rate, channels: 2, bits_per_sample: 16 }
    }

    pub const fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Byte length of `frames` frames.
    pub const fn frames_to_bytes(&self, frames: usize) -> usize {
        frames * self.bytes_per_frame()
    }
}

/// Read and write positions inside the ring, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursors {
    /// Where the device is currently reading
    pub play: usize,
    /// First byte that is safe to overwrite
    pub write: usize,
}

/// An output device that loops over a fixed ring buffer.
///
/// The device plays the ring continuously once started; the caller keeps
/// the region ahead of the play cursor filled.
pub trait RingDevice {
    /// PCM format of the ring.
    fn format(&self) -> PcmFormat;

    /// Size of the ring in bytes.
    fn buffer_bytes(&self) -> usize;

    /// Current cursor positions.
    fn cursors(&self) -> Result<Cursors, AudioError>;

    /// Lock `len` bytes starting at `offset` and hand them to `fill`.
    ///
    /// A region that runs past the end of the ring is split in two; the
    /// second slice is empty otherwise. The region is unlocked when
    /// `fill` returns.
    fn lock_region(
        &mut self,
        offset: usize,
        len: usize,
        fill: &mut dyn FnMut(&mut [u8], &mut [u8]),
    ) -> Result<(), AudioError>;

    /// Start looped playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}

/// Split `len` bytes at `offset` of `ring` into the part before the wrap
/// and the part after it.
pub fn split_region(
    ring: &mut [u8],
    offset: usize,
    len: usize,
) -> Result<(&mut [u8], &mut [u8]), AudioError> {
    let size = ring.len();
    if offset >= size || len > size {
        return Err(AudioError::BadRegion { offset, len, size });
    }
    let first_len = len.min(size - offset);
    let (head, tail) = ring.split_at_mut(offset);
    let (first, _) = tail.split_at_mut(first_len);
    let (second, _) = head.split_at_mut(len - first_len);
    Ok((first, second))
}
