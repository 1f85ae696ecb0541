//! The loaded module: header, patterns and the instrument arena.

use alloc::vec::Vec;

use crate::header::ModuleHeader;
use crate::instrument::Instrument;
use crate::pattern::{Pattern, UnpackedPattern};
use crate::sample::Sample;

/// Index of a sample inside the instrument arena.
///
/// Voices hold this instead of a reference so a reload can never leave
/// one pointing at freed sample data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleHandle {
    /// Zero-based instrument index
    pub instrument: u16,
    /// Index into that instrument's sample list
    pub sample: u16,
}

/// A complete module, immutable once loaded.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub header: ModuleHeader,
    /// Patterns as read from the file
    pub patterns: Vec<Pattern>,
    /// Patterns expanded once at load, indexed like `patterns`
    pub unpacked: Vec<UnpackedPattern>,
    /// Instruments, each owning its samples
    pub instruments: Vec<Instrument>,
}

impl Module {
    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.header.channels as usize
    }

    /// Number of used order positions.
    pub fn song_length(&self) -> usize {
        self.header.used_order().len()
    }

    /// Instrument by its 1-based number as written in events.
    pub fn instrument(&self, number: u8) -> Option<&Instrument> {
        self.instruments.get((number as usize).checked_sub(1)?)
    }

    /// Resolve the sample an (instrument, note) pair plays.
    pub fn resolve(&self, instrument: u8, note: u8) -> Option<SampleHandle> {
        let inst = self.instrument(instrument)?;
        let sample = inst.sample_for_note(note)?;
        Some(SampleHandle { instrument: instrument as u16 - 1, sample: sample as u16 })
    }

    /// Look up a sample by handle.
    pub fn sample(&self, handle: SampleHandle) -> Option<&Sample> {
        self.instruments
            .get(handle.instrument as usize)?
            .samples
            .get(handle.sample as usize)
    }

    /// Look up the instrument owning a handle's sample.
    pub fn instrument_of(&self, handle: SampleHandle) -> Option<&Instrument> {
        self.instruments.get(handle.instrument as usize)
    }

    /// Unpacked pattern at an order position. Orders naming a missing
    /// pattern yield `None` and play as silence.
    pub fn pattern_at(&self, sequence_position: usize) -> Option<&UnpackedPattern> {
        let index = self.header.pattern_at(sequence_position) as usize;
        self.unpacked.get(index)
    }

    /// Rows in the pattern at an order position (64 for missing patterns).
    pub fn rows_at(&self, sequence_position: usize) -> u16 {
        self.pattern_at(sequence_position).map_or(64, |p| p.rows)
    }
}
