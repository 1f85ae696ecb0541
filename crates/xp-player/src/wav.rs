//! RIFF/WAVE export of rendered frames.

use std::io::Write;
use xp_audio::PcmFormat;
use xp_engine::Frame;

/// Write `frames` as a PCM WAVE file in `format`.
pub fn write_wav(w: &mut impl Write, frames: &[Frame], format: PcmFormat) -> std::io::Result<()> {
    let block_align = format.bytes_per_frame() as u16;
    let data_size = frames.len() as u32 * block_align as u32;

    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")?;

    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    // integer PCM
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&format.channels.to_le_bytes())?;
    w.write_all(&format.sample_rate.to_le_bytes())?;
    w.write_all(&(format.sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&format.bits_per_sample.to_le_bytes())?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for frame in frames {
        w.write_all(&frame.to_le_bytes())?;
    }
    Ok(())
}
