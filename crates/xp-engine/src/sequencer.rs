//! Song position tracking and per-tick row processing.

use alloc::vec::Vec;
use tracing::warn;
use xp_ir::{Effect, Event, Module, Note, VolumeCommand};

use crate::effects::{FlowControl, Globals, RowContext};
use crate::frequency::{note_to_period, period_to_increment};
use crate::voice::ChannelVoice;

/// Where playback is in the song.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Index into the order table
    pub sequence: u16,
    /// Row within the current pattern
    pub row: u16,
    /// Tick within the row
    pub tick: u16,
}

/// Walks the order table, plays rows and runs tick effects.
pub struct Sequencer {
    voices: Vec<ChannelVoice>,
    globals: Globals,
    position: Position,
    /// Ticks per row
    tempo: u16,
    bpm: u16,
    /// Extra repeats left for the current row
    delay_remaining: u8,
    /// Currently repeating a delayed row
    repeating: bool,
    /// Destination set by a break, jump or loop this row
    pending: Option<(u16, u16)>,
}

impl Sequencer {
    /// A sequencer at the start of `module`, one voice per channel.
    pub fn new(module: &Module) -> Self {
        let mut sequencer = Self {
            voices: Vec::new(),
            globals: Globals::default(),
            position: Position::default(),
            tempo: 6,
            bpm: 125,
            delay_remaining: 0,
            repeating: false,
            pending: None,
        };
        sequencer.voices.resize_with(module.channels(), ChannelVoice::new);
        sequencer.reset(module);
        sequencer
    }

    /// Back to the start of the song with silent voices and default timing.
    pub fn reset(&mut self, module: &Module) {
        self.tempo = module.header.default_tempo.max(1);
        self.bpm = module.header.default_bpm.max(1);
        self.globals = Globals::default();
        self.reset_voices();
        self.goto(0, module);
    }

    /// Silence every voice and clear its effect state.
    pub fn reset_voices(&mut self) {
        for voice in &mut self.voices {
            *voice = ChannelVoice::new();
        }
    }

    /// Jump to the first row of an order position. Positions past the
    /// song end wrap to the restart position.
    pub fn goto(&mut self, sequence: u16, module: &Module) {
        self.position = Position { sequence, row: 0, tick: 0 };
        self.normalize(module);
        self.pending = None;
        self.delay_remaining = 0;
        self.repeating = false;
    }

    /// Current order position, row and tick.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Ticks per row.
    pub fn tempo(&self) -> u16 {
        self.tempo
    }

    /// Beats per minute; sets the tick length.
    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    /// Global volume (0-64).
    pub fn global_volume(&self) -> u8 {
        self.globals.global_volume
    }

    /// One voice per module channel.
    pub fn voices(&self) -> &[ChannelVoice] {
        &self.voices
    }

    /// Voices for the mixer to advance.
    pub fn voices_mut(&mut self) -> &mut [ChannelVoice] {
        &mut self.voices
    }

    /// Run one tick: play the row on tick 0, tick effects otherwise, then
    /// refresh envelopes and pitch and move the position on.
    pub fn tick(&mut self, module: &Module, sample_rate: u32) {
        for voice in &mut self.voices {
            voice.period_offset = 0;
            voice.out_volume = voice.volume;
        }

        let tick = self.position.tick;
        if tick == 0 && !self.repeating {
            self.play_row(module);
        } else {
            self.tick_effects(module, tick);
        }

        for voice in &mut self.voices {
            update_voice(voice, module, sample_rate);
        }
        self.advance(module);
    }

    fn play_row(&mut self, module: &Module) {
        let Position { sequence, row, .. } = self.position;
        let events = module
            .pattern_at(sequence as usize)
            .map_or(&[][..], |pattern| pattern.row(row));

        let mut flow = FlowControl::default();
        for (channel, voice) in self.voices.iter_mut().enumerate() {
            let event = events.get(channel).copied().unwrap_or_default();
            voice.effect = event.effect;
            voice.param = event.param;
            voice.volume_column = event.volume;

            let effect = event.effect();
            if !matches!(effect, Effect::Tremor { .. }) {
                voice.tremor_silent = false;
                voice.tremor_counter = 0;
            }
            if let Effect::NoteDelay(delay) = effect {
                if delay > 0 {
                    voice.delayed = Some(event);
                    continue;
                }
            }
            voice.delayed = None;

            let triggered = trigger(voice, &event, module);
            voice.apply_volume_row(event.volume_command());

            let sample = voice.sample.and_then(|h| module.sample(h));
            let ctx = RowContext {
                row,
                triggered,
                sample,
                has_volume_envelope: has_volume_envelope(voice, module),
            };
            voice.apply_row_effect(effect, &ctx, &mut self.globals, &mut flow);
        }
        self.apply_flow(flow);
    }

    fn tick_effects(&mut self, module: &Module, tick: u16) {
        for voice in &mut self.voices {
            if let Some(event) = voice.delayed {
                if event.effect() == Effect::NoteDelay(tick as u8) {
                    voice.delayed = None;
                    trigger(voice, &event, module);
                    voice.apply_volume_row(event.volume_command());
                }
                continue;
            }

            let has_envelope = has_volume_envelope(voice, module);
            voice.apply_volume_tick(VolumeCommand::from_raw(voice.volume_column));
            let effect = Effect::from_raw(voice.effect, voice.param);
            voice.apply_tick_effect(effect, tick, has_envelope, &mut self.globals);
        }
    }

    fn apply_flow(&mut self, flow: FlowControl) {
        if let Some(speed) = flow.speed {
            self.tempo = speed as u16;
        }
        if let Some(bpm) = flow.bpm {
            self.bpm = (bpm as u16).max(1);
        }
        if let Some(rows) = flow.pattern_delay {
            self.delay_remaining = rows;
        }
        if let Some(row) = flow.loop_to {
            self.pending = Some((self.position.sequence, row));
        }
        if flow.position_jump.is_some() || flow.pattern_break.is_some() {
            let sequence = flow
                .position_jump
                .map_or(self.position.sequence + 1, |pos| pos as u16);
            let row = flow.pattern_break.unwrap_or(0) as u16;
            self.pending = Some((sequence, row));
        }
    }

    fn advance(&mut self, module: &Module) {
        self.position.tick += 1;
        if self.position.tick < self.tempo {
            return;
        }
        self.position.tick = 0;

        if self.delay_remaining > 0 {
            self.delay_remaining -= 1;
            self.repeating = true;
            return;
        }
        self.repeating = false;

        match self.pending.take() {
            Some((sequence, row)) => {
                self.position.sequence = sequence;
                self.position.row = row;
            }
            None => {
                self.position.row += 1;
                if self.position.row >= module.rows_at(self.position.sequence as usize) {
                    self.position.sequence += 1;
                    self.position.row = 0;
                }
            }
        }
        self.normalize(module);
    }

    /// Wrap the sequence past the song end and clamp out-of-range rows.
    fn normalize(&mut self, module: &Module) {
        let song_length = module.song_length() as u16;
        if self.position.sequence >= song_length {
            let restart = module.header.restart_position;
            self.position.sequence = if restart < song_length { restart } else { 0 };
        }
        if self.position.row >= module.rows_at(self.position.sequence as usize) {
            self.position.row = 0;
        }
    }
}

fn has_volume_envelope(voice: &ChannelVoice, module: &Module) -> bool {
    voice
        .sample
        .and_then(|h| module.instrument_of(h))
        .is_some_and(|inst| inst.volume_envelope.is_active())
}

/// Apply the note and instrument columns. Returns true when a sample
/// was started from the top.
fn trigger(voice: &mut ChannelVoice, event: &Event, module: &Module) -> bool {
    if event.instrument != 0 {
        if module.instrument(event.instrument).is_some() {
            voice.instrument = event.instrument;
        } else {
            warn!(instrument = event.instrument, "instrument out of range");
        }
    }

    match event.note() {
        Note::Off => {
            let has_envelope = has_volume_envelope(voice, module);
            voice.key_off(has_envelope);
            false
        }
        Note::On(note) => {
            let Some(handle) = module.resolve(voice.instrument, note) else {
                if voice.instrument != 0 {
                    warn!(instrument = voice.instrument, note, "no sample mapped for note");
                }
                return false;
            };
            let Some(sample) = module.sample(handle) else {
                return false;
            };

            let period =
                note_to_period(note as i16 + sample.relative_note as i16, sample.finetune);
            voice.note = note;

            let tone_porta = matches!(
                event.effect(),
                Effect::TonePorta(_) | Effect::TonePortaVolumeSlide(_)
            ) || matches!(event.volume_command(), VolumeCommand::TonePorta(_));
            if tone_porta && voice.active {
                voice.target_period = period;
                if event.instrument != 0 {
                    voice.reset_volume(sample);
                }
                return false;
            }

            if event.instrument != 0 {
                voice.load_sample(handle, sample);
            } else {
                voice.select_sample(handle, sample);
            }
            voice.period = period;
            voice.target_period = period;
            voice.retrigger();
            true
        }
        Note::None => {
            if event.instrument != 0 {
                if let Some(sample) = voice.sample.and_then(|h| module.sample(h)) {
                    voice.reset_volume(sample);
                }
            }
            false
        }
    }
}

/// Per-tick refresh of envelopes, fadeout, panning and pitch step.
fn update_voice(voice: &mut ChannelVoice, module: &Module, sample_rate: u32) {
    let Some(handle) = voice.sample else {
        return;
    };

    if let Some(inst) = module.instrument_of(handle) {
        voice.envelope_volume = voice.volume_envelope.value(&inst.volume_envelope, 64);
        voice.envelope_panning = voice.panning_envelope.value(&inst.panning_envelope, 32);
        voice.volume_envelope.advance(&inst.volume_envelope, voice.released);
        voice.panning_envelope.advance(&inst.panning_envelope, voice.released);

        if voice.released && inst.volume_envelope.is_active() {
            voice.fadeout = voice.fadeout.saturating_sub(inst.fadeout as u32);
            if voice.fadeout == 0 {
                voice.active = false;
            }
        }
    }

    let pan = voice.panning as i32;
    let env = voice.envelope_panning as i32 - 32;
    let swing = 128 - (pan - 128).abs();
    voice.out_panning = (pan + env * swing / 32).clamp(0, 255) as u8;

    if voice.tremor_silent {
        voice.out_volume = 0;
    }
    voice.step = period_to_increment(voice.effective_period(), sample_rate);
}
