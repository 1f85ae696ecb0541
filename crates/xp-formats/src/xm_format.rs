//! Extended Module (XM) loader.
//!
//! File order: 60-byte preamble, extensible song header, pattern blocks,
//! then instrument blocks each followed by their sample headers and
//! delta-coded sample data. Any short read fails the whole load.

use std::path::Path;

use tracing::{debug, info, warn};
use xp_ir::{
    AutoVibrato, Envelope, Instrument, LoopType, Module, ModuleHeader, Pattern, Sample,
    SampleData, MAX_CHANNELS, MAX_INSTRUMENTS, MAX_PATTERNS, MAX_ROWS, MAX_SONG_LENGTH,
};

use crate::delta::{decode_delta16, decode_delta8};
use crate::layout::{
    decode, text, InstrumentHeader, PatternHeader, Preamble, SampleHeader, SongHeader,
    INSTRUMENT_HEADER_SIZE, PATTERN_HEADER_SIZE, PREAMBLE_SIZE, SAMPLE_HEADER_SIZE,
    SONG_HEADER_SIZE,
};
use crate::reader::ModuleReader;
use crate::unpack::unpack_pattern;
use crate::FormatError;

/// Magic string at the start of every module.
pub const SIGNATURE: &[u8; 17] = b"Extended Module: ";

const TERMINATOR: u8 = 0x1A;
const MIN_HEADER_SIZE: u32 = 20;
const MAX_HEADER_SIZE: u32 = 0x1_0000;
const MIN_INSTRUMENT_HEADER: u32 = 29;
const MAX_INSTRUMENT_HEADER: u32 = 1024;
/// Sample type bit selecting 16-bit data.
const SAMPLE_16BIT: u8 = 0x10;

/// Load a module from a file.
pub fn load_module_file(path: impl AsRef<Path>) -> Result<Module, FormatError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let module = load_module(&data)?;
    info!(
        path = %path.display(),
        name = %module.header.name,
        channels = module.header.channels,
        patterns = module.patterns.len(),
        instruments = module.instruments.len(),
        "loaded module"
    );
    Ok(module)
}

/// Load a module from bytes.
pub fn load_module(data: &[u8]) -> Result<Module, FormatError> {
    let mut reader = ModuleReader::new(data);
    let header = read_header(&mut reader)?;

    let mut patterns = Vec::with_capacity(header.pattern_count as usize);
    for index in 0..header.pattern_count {
        patterns.push(read_pattern(&mut reader, index)?);
    }

    let mut instruments = Vec::with_capacity(header.instrument_count as usize);
    for index in 0..header.instrument_count {
        instruments.push(read_instrument(&mut reader, index)?);
    }

    if reader.position() < data.len() {
        debug!(trailing = data.len() - reader.position(), "ignoring trailing bytes");
    }

    let unpacked = patterns.iter().map(|p| unpack_pattern(p, header.channels)).collect();
    Ok(Module { header, patterns, unpacked, instruments })
}

fn read_header(reader: &mut ModuleReader<'_>) -> Result<ModuleHeader, FormatError> {
    let preamble: Preamble = decode(reader.read_bytes(PREAMBLE_SIZE)?)?;
    if &preamble.signature != SIGNATURE {
        return Err(FormatError::InvalidSignature);
    }
    if preamble.terminator != TERMINATOR {
        return Err(FormatError::InvalidTerminator(preamble.terminator));
    }
    if preamble.version != 0x0104 {
        debug!(version = format_args!("0x{:04X}", preamble.version), "non-standard version");
    }

    // The size counts its own four bytes.
    let header_size = reader.read_u32_le()?;
    if !(MIN_HEADER_SIZE..=MAX_HEADER_SIZE).contains(&header_size) {
        return Err(FormatError::InvalidHeaderSize(header_size));
    }
    let buf = reader.read_padded(header_size as usize - 4, SONG_HEADER_SIZE)?;
    let song: SongHeader = decode(&buf)?;

    if song.song_length == 0 || song.song_length as usize > MAX_SONG_LENGTH {
        return Err(FormatError::InvalidSongLength(song.song_length));
    }
    if song.channels == 0 {
        return Err(FormatError::NoChannels);
    }
    if song.channels > MAX_CHANNELS {
        return Err(FormatError::TooManyChannels(song.channels));
    }
    if song.patterns > MAX_PATTERNS {
        return Err(FormatError::TooManyPatterns(song.patterns));
    }
    if song.instruments > MAX_INSTRUMENTS {
        return Err(FormatError::TooManyInstruments(song.instruments));
    }

    let mut restart_position = song.restart_position;
    if restart_position >= song.song_length {
        warn!(restart_position, song_length = song.song_length, "restart position out of range, using 0");
        restart_position = 0;
    }

    let mut header = ModuleHeader {
        version: preamble.version,
        header_size,
        song_length: song.song_length,
        restart_position,
        channels: song.channels,
        pattern_count: song.patterns,
        instrument_count: song.instruments,
        flags: song.flags,
        default_tempo: song.tempo,
        default_bpm: song.bpm,
        order: song.order,
        ..ModuleHeader::default()
    };
    let _ = header.name.try_push_str(truncate(&text(&preamble.name), 20));
    let _ = header.tracker_name.try_push_str(truncate(&text(&preamble.tracker_name), 20));
    Ok(header)
}

fn read_pattern(reader: &mut ModuleReader<'_>, index: u16) -> Result<Pattern, FormatError> {
    let header_length = reader.read_u32_le()?;
    let buf = reader.read_padded(header_length.saturating_sub(4) as usize, PATTERN_HEADER_SIZE)?;
    let header: PatternHeader = decode(&buf)?;

    if header.rows == 0 || header.rows > MAX_ROWS {
        return Err(FormatError::InvalidRowCount { pattern: index, rows: header.rows });
    }
    if header.packing_type != 0 {
        debug!(pattern = index, packing_type = header.packing_type, "unknown packing type");
    }

    let packed = reader.read_bytes(header.packed_size as usize)?.to_vec();
    Ok(Pattern { packing_type: header.packing_type, rows: header.rows, packed })
}

fn read_instrument(reader: &mut ModuleReader<'_>, index: u16) -> Result<Instrument, FormatError> {
    let size = reader.read_u32_le()?;
    if !(MIN_INSTRUMENT_HEADER..=MAX_INSTRUMENT_HEADER).contains(&size) {
        return Err(FormatError::InvalidInstrumentHeaderSize { instrument: index, size });
    }
    let buf = reader.read_padded(size as usize - 4, INSTRUMENT_HEADER_SIZE)?;
    let raw: InstrumentHeader = decode(&buf)?;

    let mut instrument = Instrument::new(truncate(&text(&raw.name), 22));
    if raw.samples == 0 {
        return Ok(instrument);
    }

    instrument.sample_map = raw.sample_map;
    instrument.volume_envelope = envelope(
        &raw.volume_points,
        raw.volume_point_count,
        raw.volume_sustain,
        raw.volume_loop_start,
        raw.volume_loop_end,
        raw.volume_type,
    );
    instrument.panning_envelope = envelope(
        &raw.panning_points,
        raw.panning_point_count,
        raw.panning_sustain,
        raw.panning_loop_start,
        raw.panning_loop_end,
        raw.panning_type,
    );
    instrument.vibrato = AutoVibrato {
        waveform: raw.vibrato_type,
        sweep: raw.vibrato_sweep,
        depth: raw.vibrato_depth,
        rate: raw.vibrato_rate,
    };
    instrument.fadeout = raw.fadeout;

    // Headers first, then data in the same order.
    let extra = (raw.sample_header_size as usize).saturating_sub(SAMPLE_HEADER_SIZE);
    let mut headers = Vec::with_capacity(raw.samples as usize);
    for _ in 0..raw.samples {
        let header: SampleHeader = decode(reader.read_bytes(SAMPLE_HEADER_SIZE)?)?;
        reader.skip(extra)?;
        headers.push(header);
    }

    for header in headers {
        let bytes = reader.read_bytes(header.length as usize)?;
        instrument.samples.push(sample(&header, bytes));
    }

    Ok(instrument)
}

fn sample(header: &SampleHeader, raw: &[u8]) -> Sample {
    let sixteen_bit = header.kind & SAMPLE_16BIT != 0;
    let (data, width) = if sixteen_bit {
        (SampleData::Pcm16(decode_delta16(raw)), 2)
    } else {
        (SampleData::Pcm8(decode_delta8(raw)), 1)
    };

    let mut sample = Sample::new(truncate(&text(&header.name), 22));
    sample.data = data;
    sample.loop_start = header.loop_start / width;
    sample.loop_length = header.loop_length / width;
    sample.loop_type = LoopType::from_type_bits(header.kind);
    sample.volume = header.volume.min(64);
    sample.finetune = header.finetune;
    sample.panning = header.panning;
    sample.relative_note = header.relative_note;

    let len = sample.len() as u32;
    if sample.loop_start >= len {
        sample.loop_start = 0;
        sample.loop_length = 0;
        sample.loop_type = LoopType::None;
    } else if sample.loop_start.saturating_add(sample.loop_length) > len {
        sample.loop_length = len - sample.loop_start;
    }
    sample
}

fn envelope(
    points: &[u16; 24],
    count: u8,
    sustain: u8,
    loop_start: u8,
    loop_end: u8,
    kind: u8,
) -> Envelope {
    let mut env = Envelope {
        sustain_point: sustain,
        loop_start,
        loop_end,
        enabled: kind & 1 != 0,
        sustain_enabled: kind & 2 != 0,
        loop_enabled: kind & 4 != 0,
        ..Envelope::default()
    };
    for pair in points.chunks_exact(2).take(count as usize) {
        env.add_point(pair[0], pair[1].min(64) as u8);
    }
    env
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate(s: &str, max: usize) -> &str {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preamble() -> Vec<u8> {
        let mut data = SIGNATURE.to_vec();
        data.extend_from_slice(&[b'x'; 20]);
        data.push(TERMINATOR);
        data.extend_from_slice(&[b' '; 20]);
        data.extend_from_slice(&0x0104u16.to_le_bytes());
        data
    }

    fn song_header(song_length: u16, restart: u16, channels: u16) -> Vec<u8> {
        let mut data = preamble();
        data.extend_from_slice(&276u32.to_le_bytes());
        for v in [song_length, restart, channels, 0, 0, 1, 6, 125] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0; 256]);
        data
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = song_header(1, 0, 4);
        data[0] = b'e';
        assert!(matches!(load_module(&data), Err(FormatError::InvalidSignature)));
    }

    #[test]
    fn rejects_bad_terminator() {
        let mut data = song_header(1, 0, 4);
        data[37] = 0;
        assert!(matches!(load_module(&data), Err(FormatError::InvalidTerminator(0))));
    }

    #[test]
    fn minimal_header_loads() {
        let module = load_module(&song_header(1, 0, 4)).unwrap();
        assert_eq!(module.header.name.as_str(), "xxxxxxxxxxxxxxxxxxxx");
        assert_eq!(module.header.tracker_name.as_str(), "");
        assert_eq!(module.header.default_bpm, 125);
        assert!(module.patterns.is_empty());
    }

    #[test]
    fn restart_past_song_end_is_clamped() {
        let module = load_module(&song_header(2, 5, 4)).unwrap();
        assert_eq!(module.header.restart_position, 0);
    }

    #[test]
    fn header_count_limits() {
        assert!(matches!(load_module(&song_header(0, 0, 4)), Err(FormatError::InvalidSongLength(0))));
        assert!(matches!(load_module(&song_header(257, 0, 4)), Err(FormatError::InvalidSongLength(257))));
        assert!(matches!(load_module(&song_header(1, 0, 0)), Err(FormatError::NoChannels)));
        assert!(matches!(load_module(&song_header(1, 0, 33)), Err(FormatError::TooManyChannels(33))));
    }

    #[test]
    fn header_size_bounds() {
        let mut data = song_header(1, 0, 4);
        data[60..64].copy_from_slice(&4u32.to_le_bytes());
        assert!(matches!(load_module(&data), Err(FormatError::InvalidHeaderSize(4))));
    }

    #[test]
    fn short_header_is_eof() {
        let data = song_header(1, 0, 4);
        assert!(matches!(load_module(&data[..200]), Err(FormatError::UnexpectedEof)));
        assert!(matches!(load_module(&data[..30]), Err(FormatError::UnexpectedEof)));
    }

    #[test]
    fn sixteen_bit_loop_points_become_frames() {
        let header = SampleHeader {
            length: 8,
            loop_start: 2,
            loop_length: 4,
            volume: 80,
            finetune: 0,
            kind: SAMPLE_16BIT | 1,
            panning: 128,
            relative_note: 0,
            reserved: 0,
            name: [0; 22],
        };
        let s = sample(&header, &[1, 0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(s.len(), 4);
        assert_eq!(s.loop_start, 1);
        assert_eq!(s.loop_length, 2);
        assert_eq!(s.volume, 64);
        assert_eq!(s.data.get(3), 4);
    }

    #[test]
    fn oversized_loop_is_clamped_to_data() {
        let header = SampleHeader {
            length: 4,
            loop_start: 1,
            loop_length: u32::MAX,
            volume: 64,
            finetune: 0,
            kind: 1,
            panning: 128,
            relative_note: 0,
            reserved: 0,
            name: [0; 22],
        };
        let s = sample(&header, &[1, 1, 1, 1]);
        assert_eq!(s.loop_start, 1);
        assert_eq!(s.loop_length, 3);
        assert_eq!(s.loop_end(), 4);
    }

    #[test]
    fn envelope_respects_point_count_and_flags() {
        let mut points = [0u16; 24];
        points[..6].copy_from_slice(&[0, 64, 10, 32, 20, 0]);
        let env = envelope(&points, 2, 1, 0, 1, 0b011);
        assert_eq!(env.points.len(), 2);
        assert!(env.enabled && env.sustain_enabled && !env.loop_enabled);
        assert_eq!(env.sustain_tick(), Some(10));
    }
}
