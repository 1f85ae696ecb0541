//! Raw and unpacked pattern types.

use alloc::vec::Vec;

use crate::event::Event;

/// Largest row count a pattern may declare.
pub const MAX_ROWS: u16 = 256;

/// A pattern as stored in the file: header fields plus packed event bytes.
#[derive(Clone, Debug, Default)]
pub struct Pattern {
    /// Packing type (only 0 is defined)
    pub packing_type: u8,
    /// Number of rows (1-256)
    pub rows: u16,
    /// Packed event stream, kept verbatim
    pub packed: Vec<u8>,
}

impl Pattern {
    /// A pattern with no packed data (every cell empty).
    pub fn empty(rows: u16) -> Self {
        Self { packing_type: 0, rows, packed: Vec::new() }
    }

    /// Size of the packed data in bytes.
    pub fn packed_size(&self) -> usize {
        self.packed.len()
    }
}

/// A pattern expanded to one [`Event`] per row and channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnpackedPattern {
    /// Number of rows
    pub rows: u16,
    /// Number of channels
    pub channels: u16,
    /// Events stored row-major: data[row * channels + channel]
    pub data: Vec<Event>,
}

impl UnpackedPattern {
    /// Create a pattern grid with empty events.
    pub fn new(rows: u16, channels: u16) -> Self {
        Self {
            rows,
            channels,
            data: alloc::vec![Event::empty(); rows as usize * channels as usize],
        }
    }

    /// Get a reference to an event.
    pub fn cell(&self, row: u16, channel: u16) -> &Event {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Get a mutable reference to an event.
    pub fn cell_mut(&mut self, row: u16, channel: u16) -> &mut Event {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &mut self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// All events in a row. Rows past the end are empty.
    pub fn row(&self, row: u16) -> &[Event] {
        let start = row as usize * self.channels as usize;
        self.data.get(start..start + self.channels as usize).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_cell_access() {
        let mut pattern = UnpackedPattern::new(64, 4);
        pattern.cell_mut(10, 2).note = 61;

        assert_eq!(pattern.cell(10, 2).note, 61);
        assert_eq!(pattern.cell(10, 1).note, 0);
        assert_eq!(pattern.row(10)[2].note, 61);
    }

    #[test]
    fn row_past_end_is_empty() {
        let pattern = UnpackedPattern::new(2, 4);
        assert_eq!(pattern.row(1).len(), 4);
        assert!(pattern.row(2).is_empty());
    }
}
