//! Pattern unpacking.
//!
//! Each cell starts with a flag byte. With the high bit set, bits 0-4
//! select which of note, instrument, volume, effect and parameter follow;
//! fields not present are zero. Otherwise the byte is the note itself and
//! the other four fields follow unconditionally.

use tracing::warn;
use xp_ir::{Event, Pattern, UnpackedPattern};

struct PackedStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl PackedStream<'_> {
    fn next(&mut self) -> Option<u8> {
        let b = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    /// Read one cell into `event`. Returns `None` once data runs out; the
    /// fields read before that point stay set.
    fn read_event(&mut self, event: &mut Event) -> Option<()> {
        let flags = self.next()?;
        if flags & 0x80 == 0 {
            event.note = flags;
            event.instrument = self.next()?;
            event.volume = self.next()?;
            event.effect = self.next()?;
            event.param = self.next()?;
            return Some(());
        }
        if flags & 0x01 != 0 {
            event.note = self.next()?;
        }
        if flags & 0x02 != 0 {
            event.instrument = self.next()?;
        }
        if flags & 0x04 != 0 {
            event.volume = self.next()?;
        }
        if flags & 0x08 != 0 {
            event.effect = self.next()?;
        }
        if flags & 0x10 != 0 {
            event.param = self.next()?;
        }
        Some(())
    }
}

/// Expand a pattern to one event per row and channel.
///
/// An empty packed stream is an all-empty pattern. A stream that ends
/// mid-pattern leaves the rest of the grid empty and logs a warning.
pub fn unpack_pattern(pattern: &Pattern, channels: u16) -> UnpackedPattern {
    let mut grid = UnpackedPattern::new(pattern.rows, channels);
    if pattern.packed.is_empty() {
        return grid;
    }

    let mut stream = PackedStream { data: &pattern.packed, pos: 0 };
    for (index, event) in grid.data.iter_mut().enumerate() {
        if stream.read_event(event).is_none() {
            let channels = channels.max(1) as usize;
            warn!(
                row = index / channels,
                channel = index % channels,
                packed = pattern.packed.len(),
                "pattern data truncated, remaining cells left empty"
            );
            break;
        }
    }
    grid
}
