//! Module header.

use arrayvec::ArrayString;

/// Number of slots in the pattern order table.
pub const MAX_SONG_LENGTH: usize = 256;

/// Upper bound on channels in one module.
pub const MAX_CHANNELS: u16 = 32;

/// Upper bound on stored patterns.
pub const MAX_PATTERNS: u16 = 256;

/// Upper bound on instruments.
pub const MAX_INSTRUMENTS: u16 = 128;

/// Song-level metadata read from the front of the file.
#[derive(Clone, Debug)]
pub struct ModuleHeader {
    /// Module name
    pub name: ArrayString<20>,
    /// Name of the tracker that wrote the file
    pub tracker_name: ArrayString<20>,
    /// Format version (0x0104 for current files)
    pub version: u16,
    /// Declared size of the extensible header, counted from the size field itself
    pub header_size: u32,
    /// Number of used slots in `order` (1-256)
    pub song_length: u16,
    /// Order index to wrap to once the song ends (< song_length)
    pub restart_position: u16,
    /// Number of channels (1-32)
    pub channels: u16,
    /// Number of stored patterns
    pub pattern_count: u16,
    /// Number of instruments
    pub instrument_count: u16,
    /// Flag word; bit 0 selects the linear frequency table
    pub flags: u16,
    /// Initial ticks per row
    pub default_tempo: u16,
    /// Initial beats per minute
    pub default_bpm: u16,
    /// Pattern order table
    pub order: [u8; MAX_SONG_LENGTH],
}

impl Default for ModuleHeader {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            tracker_name: ArrayString::new(),
            version: 0x0104,
            header_size: 276,
            song_length: 1,
            restart_position: 0,
            channels: 4,
            pattern_count: 1,
            instrument_count: 0,
            flags: 1,
            default_tempo: 6,
            default_bpm: 125,
            order: [0; MAX_SONG_LENGTH],
        }
    }
}

impl ModuleHeader {
    /// True when the module uses the linear frequency table.
    pub fn linear_frequencies(&self) -> bool {
        self.flags & 1 != 0
    }

    /// Pattern index stored at an order position.
    pub fn pattern_at(&self, sequence_position: usize) -> u8 {
        self.order.get(sequence_position).copied().unwrap_or(0)
    }

    /// The used part of the order table.
    pub fn used_order(&self) -> &[u8] {
        &self.order[..(self.song_length as usize).min(MAX_SONG_LENGTH)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_order_follows_song_length() {
        let mut header = ModuleHeader::default();
        header.song_length = 3;
        header.order[..4].copy_from_slice(&[2, 0, 1, 9]);
        assert_eq!(header.used_order(), &[2, 0, 1]);
        assert_eq!(header.pattern_at(3), 9);
        assert_eq!(header.pattern_at(1000), 0);
    }

    #[test]
    fn flag_bit_zero_is_linear_table() {
        let mut header = ModuleHeader::default();
        assert!(header.linear_frequencies());
        header.flags = 0;
        assert!(!header.linear_frequencies());
    }
}
