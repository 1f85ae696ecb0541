//! Ring-buffer audio output devices for the xmplay tracker.

mod cpal_backend;
mod memory;
mod traits;

pub use cpal_backend::CpalDevice;
pub use memory::{MemoryClock, MemoryDevice, MemoryProbe, MemoryStats};
pub use traits::{split_region, AudioError, Cursors, PcmFormat, RingDevice};
