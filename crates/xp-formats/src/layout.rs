//! Fixed on-disk layouts, decoded with binrw.
//!
//! Each header is read into a buffer padded to at least its layout size,
//! so shorter headers from older writers decode with zeroed tails and
//! longer ones simply leave trailing bytes unread.

use std::io::Cursor;

use binrw::BinRead;

use crate::FormatError;

/// Bytes before the extensible header: signature, name, 0x1A, tracker, version.
pub(crate) const PREAMBLE_SIZE: usize = 60;
/// Extensible song header, excluding its own size field.
pub(crate) const SONG_HEADER_SIZE: usize = 272;
/// Pattern header, excluding its own size field.
pub(crate) const PATTERN_HEADER_SIZE: usize = 5;
/// Instrument header, excluding its own size field.
pub(crate) const INSTRUMENT_HEADER_SIZE: usize = 239;
/// Fixed sample header.
pub(crate) const SAMPLE_HEADER_SIZE: usize = 40;

#[derive(BinRead, Debug)]
#[br(little)]
pub(crate) struct Preamble {
    pub signature: [u8; 17],
    pub name: [u8; 20],
    pub terminator: u8,
    pub tracker_name: [u8; 20],
    pub version: u16,
}

#[derive(BinRead, Debug)]
#[br(little)]
pub(crate) struct SongHeader {
    pub song_length: u16,
    pub restart_position: u16,
    pub channels: u16,
    pub patterns: u16,
    pub instruments: u16,
    pub flags: u16,
    pub tempo: u16,
    pub bpm: u16,
    pub order: [u8; 256],
}

#[derive(BinRead, Debug)]
#[br(little)]
pub(crate) struct PatternHeader {
    pub packing_type: u8,
    pub rows: u16,
    pub packed_size: u16,
}

#[derive(BinRead, Debug)]
#[br(little)]
pub(crate) struct InstrumentHeader {
    pub name: [u8; 22],
    pub kind: u8,
    pub samples: u16,
    pub sample_header_size: u32,
    pub sample_map: [u8; 96],
    pub volume_points: [u16; 24],
    pub panning_points: [u16; 24],
    pub volume_point_count: u8,
    pub panning_point_count: u8,
    pub volume_sustain: u8,
    pub volume_loop_start: u8,
    pub volume_loop_end: u8,
    pub panning_sustain: u8,
    pub panning_loop_start: u8,
    pub panning_loop_end: u8,
    pub volume_type: u8,
    pub panning_type: u8,
    pub vibrato_type: u8,
    pub vibrato_sweep: u8,
    pub vibrato_depth: u8,
    pub vibrato_rate: u8,
    pub fadeout: u16,
    pub reserved: u16,
}

#[derive(BinRead, Debug)]
#[br(little)]
pub(crate) struct SampleHeader {
    pub length: u32,
    pub loop_start: u32,
    pub loop_length: u32,
    pub volume: u8,
    pub finetune: i8,
    pub kind: u8,
    pub panning: u8,
    pub relative_note: i8,
    pub reserved: u8,
    pub name: [u8; 22],
}

/// Decode a layout from the front of `buf`.
pub(crate) fn decode<T>(buf: &[u8]) -> Result<T, FormatError>
where
    T: BinRead + binrw::meta::ReadEndian,
    for<'a> T::Args<'a>: Default,
{
    Ok(T::read_args(&mut Cursor::new(buf), Default::default())?)
}

/// Text field up to the first NUL, lossy.
pub(crate) fn text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}
