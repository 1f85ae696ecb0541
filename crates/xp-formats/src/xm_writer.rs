//! Extended Module (XM) writer.
//!
//! Produces the same layout the loader reads, so an in-memory [`Module`]
//! can be turned back into file bytes.

use xp_ir::{Envelope, Event, Instrument, LoopType, Module, Pattern, Sample, SampleData, UnpackedPattern};

use crate::delta::{encode_delta16, encode_delta8};
use crate::layout::{INSTRUMENT_HEADER_SIZE, PATTERN_HEADER_SIZE, SAMPLE_HEADER_SIZE, SONG_HEADER_SIZE};
use crate::xm_format::SIGNATURE;

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_text(out: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + width - n, 0);
}

/// Pack a pattern grid. Empty cells become a lone 0x80; other cells carry
/// only their non-zero fields.
pub fn pack_pattern(grid: &UnpackedPattern) -> Pattern {
    let mut packed = Vec::new();
    for event in &grid.data {
        pack_event(&mut packed, event);
    }
    // An all-empty pattern is stored with no data at all.
    if packed.iter().all(|&b| b == 0x80) {
        packed.clear();
    }
    Pattern { packing_type: 0, rows: grid.rows, packed }
}

fn pack_event(out: &mut Vec<u8>, event: &Event) {
    let fields = [event.note, event.instrument, event.volume, event.effect, event.param];
    let mut flags = 0x80u8;
    for (bit, &value) in fields.iter().enumerate() {
        if value != 0 {
            flags |= 1 << bit;
        }
    }
    out.push(flags);
    out.extend(fields.iter().copied().filter(|&v| v != 0));
}

/// Serialize a module.
///
/// Patterns are taken from `module.patterns` where present and packed
/// from `module.unpacked` otherwise. Counts in the header follow the
/// vectors, not the stored header fields.
pub fn write_module(module: &Module) -> Vec<u8> {
    let header = &module.header;
    let pattern_count = module.patterns.len().max(module.unpacked.len());

    let mut out = Vec::new();
    out.extend_from_slice(SIGNATURE);
    put_text(&mut out, &header.name, 20);
    out.push(0x1A);
    put_text(&mut out, &header.tracker_name, 20);
    put_u16(&mut out, header.version);

    put_u32(&mut out, SONG_HEADER_SIZE as u32 + 4);
    put_u16(&mut out, header.song_length);
    put_u16(&mut out, header.restart_position);
    put_u16(&mut out, header.channels);
    put_u16(&mut out, pattern_count as u16);
    put_u16(&mut out, module.instruments.len() as u16);
    put_u16(&mut out, header.flags);
    put_u16(&mut out, header.default_tempo);
    put_u16(&mut out, header.default_bpm);
    out.extend_from_slice(&header.order);

    for index in 0..pattern_count {
        let packed;
        let pattern = match module.patterns.get(index) {
            Some(p) => p,
            None => {
                packed = pack_pattern(&module.unpacked[index]);
                &packed
            }
        };
        put_u32(&mut out, PATTERN_HEADER_SIZE as u32 + 4);
        out.push(pattern.packing_type);
        put_u16(&mut out, pattern.rows);
        put_u16(&mut out, pattern.packed.len() as u16);
        out.extend_from_slice(&pattern.packed);
    }

    for instrument in &module.instruments {
        write_instrument(&mut out, instrument);
    }
    out
}

fn write_instrument(out: &mut Vec<u8>, inst: &Instrument) {
    if inst.samples.is_empty() {
        put_u32(out, 29);
        put_text(out, &inst.name, 22);
        out.push(0);
        put_u16(out, 0);
        return;
    }

    put_u32(out, INSTRUMENT_HEADER_SIZE as u32 + 4);
    put_text(out, &inst.name, 22);
    out.push(0);
    put_u16(out, inst.samples.len() as u16);
    put_u32(out, SAMPLE_HEADER_SIZE as u32);
    out.extend_from_slice(&inst.sample_map);
    write_points(out, &inst.volume_envelope);
    write_points(out, &inst.panning_envelope);
    out.push(inst.volume_envelope.points.len() as u8);
    out.push(inst.panning_envelope.points.len() as u8);
    for env in [&inst.volume_envelope, &inst.panning_envelope] {
        out.extend_from_slice(&[env.sustain_point, env.loop_start, env.loop_end]);
    }
    out.push(envelope_type(&inst.volume_envelope));
    out.push(envelope_type(&inst.panning_envelope));
    let v = inst.vibrato;
    out.extend_from_slice(&[v.waveform, v.sweep, v.depth, v.rate]);
    put_u16(out, inst.fadeout);
    put_u16(out, 0);

    let encoded: Vec<Vec<u8>> = inst.samples.iter().map(encode_sample).collect();
    for (sample, data) in inst.samples.iter().zip(&encoded) {
        write_sample_header(out, sample, data.len() as u32);
    }
    for data in &encoded {
        out.extend_from_slice(data);
    }
}

fn write_points(out: &mut Vec<u8>, env: &Envelope) {
    for i in 0..xp_ir::MAX_ENVELOPE_POINTS {
        let (tick, value) = env.points.get(i).map_or((0, 0), |p| (p.tick, p.value as u16));
        put_u16(out, tick);
        put_u16(out, value);
    }
}

fn envelope_type(env: &Envelope) -> u8 {
    env.enabled as u8 | (env.sustain_enabled as u8) << 1 | (env.loop_enabled as u8) << 2
}

fn encode_sample(sample: &Sample) -> Vec<u8> {
    match &sample.data {
        SampleData::Pcm8(pcm) => encode_delta8(pcm),
        SampleData::Pcm16(pcm) => encode_delta16(pcm),
    }
}

fn write_sample_header(out: &mut Vec<u8>, sample: &Sample, byte_len: u32) {
    let width = sample.data.bits() as u32 / 8;
    let loop_bits = match sample.loop_type {
        LoopType::None => 0,
        LoopType::Forward => 1,
        LoopType::PingPong => 2,
    };
    let kind = loop_bits | if width == 2 { 0x10 } else { 0 };

    put_u32(out, byte_len);
    put_u32(out, sample.loop_start * width);
    put_u32(out, sample.loop_length * width);
    out.push(sample.volume);
    out.push(sample.finetune as u8);
    out.push(kind);
    out.push(sample.panning);
    out.push(sample.relative_note as u8);
    out.push(0);
    put_text(out, &sample.name, 22);
}
