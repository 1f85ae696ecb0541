//! Synthetic modules shared by the integration tests.

use xp_ir::{Envelope, Event, Instrument, LoopType, Module, Sample, SampleData, UnpackedPattern};

fn fx(effect: u8, param: u8) -> Event {
    Event { effect, param, ..Event::empty() }
}

fn note(note: u8, instrument: u8) -> Event {
    Event { note, instrument, ..Event::empty() }
}

/// A four-channel song that touches most of the effect set, both loop
/// modes, both sample depths and an enveloped instrument.
pub fn busy_module() -> Module {
    let mut module = Module::default();
    let _ = module.header.name.try_push_str("busy");
    module.header.channels = 4;
    module.header.song_length = 3;
    module.header.restart_position = 1;
    module.header.order[..3].copy_from_slice(&[0, 1, 0]);

    let mut main = UnpackedPattern::new(32, 4);
    *main.cell_mut(0, 0) = Event { effect: 0x00, param: 0x37, ..note(49, 1) };
    *main.cell_mut(4, 0) = fx(0x04, 0x46);
    *main.cell_mut(8, 0) = Event { effect: 0x03, param: 0x10, ..note(61, 1) };
    *main.cell_mut(12, 0) = fx(0x0E, 0x93);
    *main.cell_mut(14, 0) = fx(0x1B, 0x83);
    *main.cell_mut(16, 0) = note(97, 0);
    *main.cell_mut(18, 0) = Event { effect: 0x09, param: 0x01, ..note(37, 1) };
    *main.cell_mut(20, 0) = fx(0x0E, 0xC2);

    *main.cell_mut(0, 1) = Event { volume: 0x30, ..note(37, 2) };
    *main.cell_mut(2, 1) = Event { volume: 0x64, ..fx(0x07, 0x88) };
    *main.cell_mut(6, 1) = fx(0x1D, 0x21);
    *main.cell_mut(10, 1) = fx(0x19, 0x40);
    *main.cell_mut(16, 1) = note(97, 0);
    *main.cell_mut(24, 1) = Event { volume: 0xF8, ..note(49, 2) };

    *main.cell_mut(0, 2) = note(25, 1);
    *main.cell_mut(1, 2) = fx(0x01, 0x08);
    *main.cell_mut(3, 2) = fx(0x02, 0x10);
    *main.cell_mut(5, 2) = fx(0x21, 0x14);
    *main.cell_mut(8, 2) = fx(0x0E, 0x60);
    *main.cell_mut(9, 2) = fx(0x0E, 0x61);
    *main.cell_mut(12, 2) = fx(0x11, 0x02);
    *main.cell_mut(13, 2) = fx(0x10, 0x40);

    *main.cell_mut(0, 3) = Event { volume: 0xC0, ..note(73, 2) };
    *main.cell_mut(4, 3) = fx(0x05, 0x02);
    *main.cell_mut(6, 3) = fx(0x06, 0x20);
    *main.cell_mut(8, 3) = fx(0x0A, 0x0F);
    *main.cell_mut(31, 3) = fx(0x0D, 0x00);
    module.unpacked.push(main);

    let mut turn = UnpackedPattern::new(16, 4);
    *turn.cell_mut(0, 0) = Event { effect: 0x0E, param: 0xD3, ..note(49, 1) };
    *turn.cell_mut(0, 1) = fx(0x0F, 0x04);
    *turn.cell_mut(2, 1) = fx(0x0E, 0xE2);
    *turn.cell_mut(4, 1) = fx(0x0F, 0x90);
    *turn.cell_mut(15, 3) = fx(0x0B, 0x00);
    module.unpacked.push(turn);

    let mut square = Sample::new("square");
    square.data = SampleData::Pcm8((0..64).map(|i| if i % 16 < 8 { 90 } else { -90 }).collect());
    square.loop_type = LoopType::Forward;
    square.loop_start = 16;
    square.loop_length = 48;
    let mut lead = Instrument::new("lead");
    lead.samples.push(square);
    module.instruments.push(lead);

    let mut ramp = Sample::new("ramp");
    ramp.data = SampleData::Pcm16((0..128).map(|i| i * 256 - 16384).collect());
    ramp.loop_type = LoopType::PingPong;
    ramp.loop_start = 32;
    ramp.loop_length = 64;
    ramp.finetune = 24;
    let mut pad = Instrument::new("pad");
    pad.fadeout = 1024;
    pad.volume_envelope = Envelope {
        enabled: true,
        sustain_enabled: true,
        sustain_point: 1,
        ..Envelope::default()
    };
    pad.volume_envelope.add_point(0, 0);
    pad.volume_envelope.add_point(6, 64);
    pad.volume_envelope.add_point(40, 20);
    pad.panning_envelope = Envelope {
        enabled: true,
        loop_enabled: true,
        loop_start: 0,
        loop_end: 1,
        ..Envelope::default()
    };
    pad.panning_envelope.add_point(0, 0);
    pad.panning_envelope.add_point(16, 64);
    pad.samples.push(ramp);
    module.instruments.push(pad);

    module
}

/// One channel, one looping square, a single note on row 0.
pub fn tone_module(rows: u16) -> Module {
    let mut module = Module::default();
    module.header.channels = 1;
    let mut pattern = UnpackedPattern::new(rows, 1);
    *pattern.cell_mut(0, 0) = note(49, 1);
    module.unpacked.push(pattern);

    let mut sample = Sample::new("tone");
    sample.data = SampleData::Pcm8((0..32).map(|i| if i < 16 { 80 } else { -80 }).collect());
    sample.loop_type = LoopType::Forward;
    sample.loop_length = 32;
    let mut inst = Instrument::new("tone");
    inst.samples.push(sample);
    module.instruments.push(inst);
    module
}
