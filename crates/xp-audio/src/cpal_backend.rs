//! CPAL-based ring-buffer device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::traits::{split_region, AudioError, Cursors, PcmFormat, RingDevice};

/// How long a writer waits for the stream callback to release the ring.
const LOCK_TIMEOUT: Duration = Duration::from_millis(5);

struct Ring {
    data: Vec<u8>,
    /// Byte offset the stream callback reads next
    read: usize,
}

impl Ring {
    /// Pop one stereo frame and clear it so an underrun plays silence.
    fn pop_frame(&mut self) -> (i16, i16) {
        let at = self.read;
        let bytes = &mut self.data[at..at + 4];
        let left = i16::from_le_bytes([bytes[0], bytes[1]]);
        let right = i16::from_le_bytes([bytes[2], bytes[3]]);
        bytes.fill(0);
        self.read = (at + 4) % self.data.len();
        (left, right)
    }
}

/// Default output device fed from a looping byte ring.
pub struct CpalDevice {
    format: PcmFormat,
    buffer_bytes: usize,
    stream: Stream,
    ring: Arc<Mutex<Ring>>,
    running: Arc<AtomicBool>,
}

impl CpalDevice {
    /// Open the default output device with a ring of `buffer_frames` frames.
    pub fn new(buffer_frames: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // Force stereo output; the ring is interleaved 2-channel
        config.channels = 2;
        let format = PcmFormat::stereo16(config.sample_rate.0);

        let buffer_bytes = format.frames_to_bytes(buffer_frames.max(1));
        let ring = Arc::new(Mutex::new(Ring {
            data: vec![0; buffer_bytes],
            read: 0,
        }));
        let running = Arc::new(AtomicBool::new(false));

        let stream = {
            let ring = ring.clone();
            let running = running.clone();
            let channels = config.channels as usize;
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let guard = match running.load(Ordering::Relaxed) {
                            true => ring.try_lock(),
                            false => None,
                        };
                        let Some(mut ring) = guard else {
                            data.fill(0.0);
                            return;
                        };
                        for chunk in data.chunks_mut(channels) {
                            let (left, right) = ring.pop_frame();
                            for (i, sample) in chunk.iter_mut().enumerate() {
                                *sample = match i {
                                    0 => left as f32 / 32768.0,
                                    1 => right as f32 / 32768.0,
                                    _ => 0.0,
                                };
                            }
                        }
                    },
                    |err| error!(%err, "audio stream error"),
                    None,
                )
                .map_err(|e| AudioError::StreamCreate(e.to_string()))?
        };

        let name = device.name().unwrap_or_default();
        info!(
            device = %name,
            sample_rate = format.sample_rate,
            buffer_frames,
            "opened output device"
        );
        Ok(Self { format, buffer_bytes, stream, ring, running })
    }
}

impl RingDevice for CpalDevice {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn buffer_bytes(&self) -> usize {
        self.buffer_bytes
    }

    fn cursors(&self) -> Result<Cursors, AudioError> {
        let ring = self.ring.try_lock_for(LOCK_TIMEOUT).ok_or(AudioError::LockFailed)?;
        Ok(Cursors { play: ring.read, write: ring.read })
    }

    fn lock_region(
        &mut self,
        offset: usize,
        len: usize,
        fill: &mut dyn FnMut(&mut [u8], &mut [u8]),
    ) -> Result<(), AudioError> {
        let mut ring = self.ring.try_lock_for(LOCK_TIMEOUT).ok_or(AudioError::LockFailed)?;
        let (first, second) = split_region(&mut ring.data, offset, len)?;
        fill(first, second);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        self.stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        self.stream.pause().map_err(|e| AudioError::Playback(e.to_string()))
    }
}
