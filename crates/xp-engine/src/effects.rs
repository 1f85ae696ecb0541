//! Effect processing: pure state transforms on a channel voice.
//!
//! Row effects run once on tick 0, tick effects on every later tick of
//! the row. Anything that changes song flow is reported through
//! [`FlowControl`] for the sequencer to act on.

use xp_ir::{Effect, Sample, VolumeCommand};

use crate::frequency::{clamp_period, SEMITONE};
use crate::voice::ChannelVoice;

/// Half a sine cycle, amplitude 255.
const SINE_HALF: [u8; 32] = [
    0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253, 255, 253, 250, 244,
    235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24,
];

/// Signed sine over a 64-step cycle.
pub fn sine(phase: u8) -> i32 {
    let p = (phase & 63) as usize;
    if p < 32 {
        SINE_HALF[p] as i32
    } else {
        -(SINE_HALF[p - 32] as i32)
    }
}

/// Song-wide state that effects may change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Globals {
    /// Global volume (0-64)
    pub global_volume: u8,
}

impl Default for Globals {
    fn default() -> Self {
        Self { global_volume: 64 }
    }
}

/// Flow changes requested while processing a row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlowControl {
    /// Jump to this order position at the end of the row
    pub position_jump: Option<u8>,
    /// Continue at this row of the next (or jumped-to) order position
    pub pattern_break: Option<u8>,
    /// New ticks per row
    pub speed: Option<u8>,
    /// New beats per minute
    pub bpm: Option<u8>,
    /// Repeat the current row this many extra times
    pub pattern_delay: Option<u8>,
    /// Jump back to this row of the current pattern
    pub loop_to: Option<u16>,
}

/// What the row did to the voice that effects need to know about.
#[derive(Clone, Copy, Debug, Default)]
pub struct RowContext<'a> {
    /// Row being played (for pattern loops)
    pub row: u16,
    /// A note was (re)triggered on this row
    pub triggered: bool,
    /// The sounding sample
    pub sample: Option<&'a Sample>,
    /// The instrument has an enabled volume envelope
    pub has_volume_envelope: bool,
}

/// Apply one of the sixteen multi-retrigger volume rules.
pub fn retrigger_volume(volume: u8, rule: u8) -> u8 {
    let v = volume as i32;
    let out = match rule & 0x0F {
        0x1 => v - 1,
        0x2 => v - 2,
        0x3 => v - 4,
        0x4 => v - 8,
        0x5 => v - 16,
        0x6 => v * 2 / 3,
        0x7 => v / 2,
        0x9 => v + 1,
        0xA => v + 2,
        0xB => v + 4,
        0xC => v + 8,
        0xD => v + 16,
        0xE => v * 3 / 2,
        0xF => v * 2,
        _ => v,
    };
    out.clamp(0, 64) as u8
}

fn remember(slot: &mut u8, param: u8) -> u8 {
    if param != 0 {
        *slot = param;
    }
    *slot
}

impl ChannelVoice {
    /// Apply an effect on tick 0 of its row.
    pub fn apply_row_effect(
        &mut self,
        effect: Effect,
        ctx: &RowContext<'_>,
        globals: &mut Globals,
        flow: &mut FlowControl,
    ) {
        match effect {
            Effect::SetVolume(v) => self.set_volume(v),
            Effect::SetPan(p) => self.panning = p,
            Effect::SampleOffset(param) => {
                let offset = remember(&mut self.memory.sample_offset, param);
                if ctx.triggered {
                    let len = ctx.sample.map_or(0, |s| s.len() as u64);
                    self.position = ((offset as u64) << 8).min(len) << 16;
                }
            }
            Effect::PositionJump(pos) => {
                flow.position_jump = Some(pos);
            }
            Effect::PatternBreak(row) => {
                flow.pattern_break = Some(row);
            }
            Effect::SetSpeed(s) if s > 0 => flow.speed = Some(s),
            Effect::SetSpeed(_) => {}
            Effect::SetTempo(bpm) => flow.bpm = Some(bpm),
            Effect::SetGlobalVolume(v) => globals.global_volume = v.min(64),
            Effect::KeyOff(0) => self.key_off(ctx.has_volume_envelope),
            Effect::SetEnvelopePosition(tick) => {
                self.volume_envelope.set_tick(tick as u16);
                self.panning_envelope.set_tick(tick as u16);
            }

            // Memory for continuous effects
            Effect::VolumeSlide(p)
            | Effect::TonePortaVolumeSlide(p)
            | Effect::VibratoVolumeSlide(p) => {
                remember(&mut self.memory.volume_slide, p);
            }
            Effect::PortaUp(p) => {
                remember(&mut self.memory.porta_up, p);
            }
            Effect::PortaDown(p) => {
                remember(&mut self.memory.porta_down, p);
            }
            Effect::TonePorta(p) => {
                remember(&mut self.memory.tone_porta, p);
            }
            Effect::Vibrato { speed, depth } => {
                remember(&mut self.vibrato_speed, speed);
                remember(&mut self.vibrato_depth, depth);
            }
            Effect::Tremolo { speed, depth } => {
                remember(&mut self.tremolo_speed, speed);
                remember(&mut self.tremolo_depth, depth);
            }
            Effect::PanningSlide(p) => {
                remember(&mut self.memory.panning_slide, p);
            }
            Effect::GlobalVolumeSlide(p) => {
                remember(&mut self.memory.global_volume_slide, p);
            }
            Effect::MultiRetrigger { interval, volume } => {
                remember(&mut self.memory.retrigger, volume << 4 | interval);
            }
            Effect::Tremor { on, off } => {
                remember(&mut self.memory.tremor, on << 4 | off);
            }

            // One-shot fine adjustments
            Effect::FinePortaUp(p) => {
                let p = remember(&mut self.memory.fine_porta_up, p);
                self.period = clamp_period(self.period - p as i32 * 4);
            }
            Effect::FinePortaDown(p) => {
                let p = remember(&mut self.memory.fine_porta_down, p);
                self.period = clamp_period(self.period + p as i32 * 4);
            }
            Effect::ExtraFinePortaUp(p) => {
                let p = remember(&mut self.memory.extra_fine_porta_up, p);
                self.period = clamp_period(self.period - p as i32);
            }
            Effect::ExtraFinePortaDown(p) => {
                let p = remember(&mut self.memory.extra_fine_porta_down, p);
                self.period = clamp_period(self.period + p as i32);
            }
            Effect::FineVolumeSlideUp(p) => {
                let p = remember(&mut self.memory.fine_volume_up, p);
                self.set_volume(self.volume.saturating_add(p));
            }
            Effect::FineVolumeSlideDown(p) => {
                let p = remember(&mut self.memory.fine_volume_down, p);
                self.set_volume(self.volume.saturating_sub(p));
            }
            Effect::NoteCut(0) => self.set_volume(0),

            Effect::PatternLoop(0) => self.loop_row = ctx.row,
            Effect::PatternLoop(count) => {
                if self.loop_count == 0 {
                    self.loop_count = count;
                    flow.loop_to = Some(self.loop_row);
                } else {
                    self.loop_count -= 1;
                    if self.loop_count > 0 {
                        flow.loop_to = Some(self.loop_row);
                    }
                }
            }
            Effect::PatternDelay(rows) => flow.pattern_delay = Some(rows),
            _ => {}
        }
    }

    /// Apply an effect on a tick after the first.
    pub fn apply_tick_effect(
        &mut self,
        effect: Effect,
        tick: u16,
        has_volume_envelope: bool,
        globals: &mut Globals,
    ) {
        match effect {
            Effect::Arpeggio { x, y } => {
                let semis = match tick % 3 {
                    1 => x,
                    2 => y,
                    _ => 0,
                };
                self.period_offset = -(semis as i32) * SEMITONE;
            }
            Effect::PortaUp(_) => {
                self.period = clamp_period(self.period - self.memory.porta_up as i32 * 4);
            }
            Effect::PortaDown(_) => {
                self.period = clamp_period(self.period + self.memory.porta_down as i32 * 4);
            }
            Effect::TonePorta(_) => self.tone_portamento(),
            Effect::Vibrato { .. } => self.vibrato(),
            Effect::TonePortaVolumeSlide(_) => {
                self.tone_portamento();
                self.volume_slide();
            }
            Effect::VibratoVolumeSlide(_) => {
                self.vibrato();
                self.volume_slide();
            }
            Effect::Tremolo { .. } => self.tremolo(),
            Effect::VolumeSlide(_) => self.volume_slide(),
            Effect::PanningSlide(_) => {
                let p = self.memory.panning_slide;
                let (right, left) = (p >> 4, p & 0x0F);
                self.panning = if right != 0 {
                    self.panning.saturating_add(right)
                } else {
                    self.panning.saturating_sub(left)
                };
            }
            Effect::GlobalVolumeSlide(_) => {
                let p = self.memory.global_volume_slide;
                let (up, down) = (p >> 4, p & 0x0F);
                let v = globals.global_volume as i32;
                let v = if up != 0 { v + up as i32 } else { v - down as i32 };
                globals.global_volume = v.clamp(0, 64) as u8;
            }
            Effect::KeyOff(t) if t as u16 == tick => self.key_off(has_volume_envelope),
            Effect::MultiRetrigger { .. } => {
                let p = self.memory.retrigger;
                let (rule, interval) = (p >> 4, p & 0x0F);
                if interval == 0 {
                    return;
                }
                self.retrigger_counter += 1;
                if self.retrigger_counter >= interval {
                    let volume = retrigger_volume(self.volume, rule);
                    self.restart_sample();
                    self.set_volume(volume);
                }
            }
            Effect::Tremor { .. } => {
                let p = self.memory.tremor;
                let on = (p >> 4) + 1;
                let off = (p & 0x0F) + 1;
                self.tremor_silent = self.tremor_counter >= on;
                self.tremor_counter = (self.tremor_counter + 1) % (on + off);
            }
            Effect::RetriggerNote(interval) if interval > 0 && tick % interval as u16 == 0 => {
                self.restart_sample();
            }
            Effect::NoteCut(t) if t as u16 == tick => self.set_volume(0),
            _ => {}
        }
    }

    /// Apply the volume column on tick 0.
    pub fn apply_volume_row(&mut self, cmd: VolumeCommand) {
        match cmd {
            VolumeCommand::Volume(v) => self.set_volume(v),
            VolumeCommand::FineVolumeSlideDown(v) => self.set_volume(self.volume.saturating_sub(v)),
            VolumeCommand::FineVolumeSlideUp(v) => self.set_volume(self.volume.saturating_add(v)),
            VolumeCommand::VibratoSpeed(s) => {
                remember(&mut self.vibrato_speed, s);
            }
            VolumeCommand::VibratoDepth(d) => {
                remember(&mut self.vibrato_depth, d);
            }
            VolumeCommand::Panning(p) => self.panning = p << 4,
            VolumeCommand::TonePorta(p) => {
                remember(&mut self.memory.tone_porta, p << 4);
            }
            _ => {}
        }
    }

    /// Apply the volume column on ticks after the first.
    pub fn apply_volume_tick(&mut self, cmd: VolumeCommand) {
        match cmd {
            VolumeCommand::VolumeSlideDown(v) => self.set_volume(self.volume.saturating_sub(v)),
            VolumeCommand::VolumeSlideUp(v) => self.set_volume(self.volume.saturating_add(v)),
            VolumeCommand::VibratoDepth(_) => self.vibrato(),
            VolumeCommand::PanningSlideLeft(p) => self.panning = self.panning.saturating_sub(p),
            VolumeCommand::PanningSlideRight(p) => self.panning = self.panning.saturating_add(p),
            VolumeCommand::TonePorta(_) => self.tone_portamento(),
            _ => {}
        }
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(64);
        self.out_volume = self.volume;
    }

    /// Low nibble slides up, high nibble slides down. Reaching zero
    /// stops the voice.
    fn volume_slide(&mut self) {
        let p = self.memory.volume_slide;
        let (down, up) = (p >> 4, p & 0x0F);
        let v = self.volume as i32;
        let v = if up != 0 { v + up as i32 } else { v - down as i32 };
        self.set_volume(v.clamp(0, 64) as u8);
        if self.volume == 0 {
            self.active = false;
        }
    }

    fn tone_portamento(&mut self) {
        if self.target_period == 0 {
            return;
        }
        let speed = self.memory.tone_porta as i32 * 4;
        self.period = if self.period < self.target_period {
            (self.period + speed).min(self.target_period)
        } else {
            (self.period - speed).max(self.target_period)
        };
    }

    fn vibrato(&mut self) {
        self.period_offset = sine(self.vibrato_phase) * self.vibrato_depth as i32 >> 5;
        self.vibrato_phase = self.vibrato_phase.wrapping_add(self.vibrato_speed) & 63;
    }

    fn tremolo(&mut self) {
        let delta = sine(self.tremolo_phase) * self.tremolo_depth as i32 >> 6;
        self.out_volume = (self.volume as i32 + delta).clamp(0, 64) as u8;
        self.tremolo_phase = self.tremolo_phase.wrapping_add(self.tremolo_speed) & 63;
    }

    /// Restart sample playback in place, keeping volume and envelopes.
    fn restart_sample(&mut self) {
        self.position = 0;
        self.backwards = false;
        self.retrigger_counter = 0;
        self.active = self.sample.is_some();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xp_ir::SampleHandle;

    fn sounding(volume: u8) -> ChannelVoice {
        let mut v = ChannelVoice::new();
        v.sample = Some(SampleHandle { instrument: 0, sample: 0 });
        v.retrigger();
        v.volume = volume;
        v.out_volume = volume;
        v.period = 4608;
        v
    }

    fn run_row(voice: &mut ChannelVoice, effect: Effect, ticks: u16) -> Globals {
        let mut globals = Globals::default();
        let mut flow = FlowControl::default();
        voice.apply_row_effect(effect, &RowContext::default(), &mut globals, &mut flow);
        for tick in 1..ticks {
            voice.apply_tick_effect(effect, tick, false, &mut globals);
        }
        globals
    }

    #[test]
    fn volume_slide_up_clamps_at_64() {
        let mut voice = sounding(50);
        // row tick plus three slide ticks
        run_row(&mut voice, Effect::VolumeSlide(0x05), 4);
        assert_eq!(voice.volume, 64);
        assert!(voice.active);
    }

    #[test]
    fn volume_slide_down_to_zero_stops_voice() {
        let mut voice = sounding(10);
        run_row(&mut voice, Effect::VolumeSlide(0x40), 4);
        assert_eq!(voice.volume, 0);
        assert!(!voice.active);
    }

    #[test]
    fn zero_parameter_reuses_last_slide() {
        let mut voice = sounding(20);
        run_row(&mut voice, Effect::VolumeSlide(0x02), 2);
        assert_eq!(voice.volume, 22);
        run_row(&mut voice, Effect::VolumeSlide(0x00), 3);
        assert_eq!(voice.volume, 26);
    }

    #[test]
    fn fine_slides_only_on_row_tick() {
        let mut voice = sounding(30);
        run_row(&mut voice, Effect::FineVolumeSlideUp(3), 6);
        assert_eq!(voice.volume, 33);
        run_row(&mut voice, Effect::FinePortaUp(2), 6);
        assert_eq!(voice.period, 4608 - 8);
    }

    #[test]
    fn tone_porta_never_overshoots() {
        let mut voice = sounding(64);
        voice.target_period = 4608 - 10;
        run_row(&mut voice, Effect::TonePorta(2), 6);
        assert_eq!(voice.period, 4608 - 10);

        voice.target_period = 4608;
        run_row(&mut voice, Effect::TonePorta(1), 3);
        assert_eq!(voice.period, 4608 - 2);
    }

    #[test]
    fn vibrato_offsets_period_around_base() {
        let mut voice = sounding(64);
        let mut globals = Globals::default();
        let effect = Effect::Vibrato { speed: 16, depth: 8 };
        voice.apply_row_effect(effect, &RowContext::default(), &mut globals, &mut FlowControl::default());
        voice.apply_tick_effect(effect, 1, false, &mut globals);
        assert_eq!(voice.period_offset, 0);
        voice.apply_tick_effect(effect, 2, false, &mut globals);
        // quarter cycle: 255 * 8 / 32
        assert_eq!(voice.period_offset, 63);
        assert_eq!(voice.period, 4608);
    }

    #[test]
    fn tremolo_stays_in_range() {
        let mut voice = sounding(60);
        let mut globals = Globals::default();
        let effect = Effect::Tremolo { speed: 16, depth: 15 };
        voice.apply_row_effect(effect, &RowContext::default(), &mut globals, &mut FlowControl::default());
        voice.apply_tick_effect(effect, 1, false, &mut globals);
        voice.apply_tick_effect(effect, 2, false, &mut globals);
        assert_eq!(voice.out_volume, 64);
        assert_eq!(voice.volume, 60);
    }

    #[test]
    fn sample_offset_clamps_to_length() {
        let mut sample = Sample::new("s");
        sample.data = xp_ir::SampleData::Pcm8(vec![0; 300]);
        let mut voice = sounding(64);
        let ctx = RowContext { triggered: true, sample: Some(&sample), ..RowContext::default() };
        let mut globals = Globals::default();
        voice.apply_row_effect(Effect::SampleOffset(1), &ctx, &mut globals, &mut FlowControl::default());
        assert_eq!(voice.position, 256 << 16);
        voice.apply_row_effect(Effect::SampleOffset(2), &ctx, &mut globals, &mut FlowControl::default());
        assert_eq!(voice.position, 300 << 16);
    }

    #[test]
    fn flow_effects_are_reported() {
        let mut voice = sounding(64);
        let mut globals = Globals::default();
        let mut flow = FlowControl::default();
        let ctx = RowContext::default();
        voice.apply_row_effect(Effect::PatternBreak(12), &ctx, &mut globals, &mut flow);
        voice.apply_row_effect(Effect::SetTempo(140), &ctx, &mut globals, &mut flow);
        voice.apply_row_effect(Effect::SetSpeed(3), &ctx, &mut globals, &mut flow);
        voice.apply_row_effect(Effect::SetGlobalVolume(32), &ctx, &mut globals, &mut flow);
        assert_eq!(flow.pattern_break, Some(12));
        assert_eq!(flow.bpm, Some(140));
        assert_eq!(flow.speed, Some(3));
        assert_eq!(globals.global_volume, 32);
    }

    #[test]
    fn global_volume_slide_clamps() {
        let mut voice = sounding(64);
        let globals = run_row(&mut voice, Effect::GlobalVolumeSlide(0x20), 4);
        assert_eq!(globals.global_volume, 64);
        let globals = run_row(&mut voice, Effect::GlobalVolumeSlide(0x0F), 4);
        assert_eq!(globals.global_volume, 64 - 3 * 15);
    }

    #[test]
    fn multi_retrigger_resets_position_and_volume() {
        let mut voice = sounding(32);
        voice.position = 99 << 16;
        let mut globals = Globals::default();
        let effect = Effect::MultiRetrigger { interval: 2, volume: 0x7 };
        voice.apply_row_effect(effect, &RowContext::default(), &mut globals, &mut FlowControl::default());
        voice.apply_tick_effect(effect, 1, false, &mut globals);
        assert_eq!(voice.position, 99 << 16);
        voice.apply_tick_effect(effect, 2, false, &mut globals);
        assert_eq!(voice.position, 0);
        assert_eq!(voice.volume, 16);
    }

    #[test]
    fn retrigger_volume_rules() {
        assert_eq!(retrigger_volume(10, 0x5), 0);
        assert_eq!(retrigger_volume(30, 0x6), 20);
        assert_eq!(retrigger_volume(40, 0xE), 60);
        assert_eq!(retrigger_volume(40, 0xF), 64);
        assert_eq!(retrigger_volume(40, 0x8), 40);
    }

    #[test]
    fn tremor_duty_cycle() {
        let mut voice = sounding(64);
        let mut globals = Globals::default();
        let effect = Effect::Tremor { on: 1, off: 0 };
        voice.apply_row_effect(effect, &RowContext::default(), &mut globals, &mut FlowControl::default());
        let mut pattern = Vec::new();
        for tick in 1..7 {
            voice.apply_tick_effect(effect, tick, false, &mut globals);
            pattern.push(voice.tremor_silent);
        }
        assert_eq!(pattern, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn key_off_on_later_tick() {
        let mut voice = sounding(48);
        run_row(&mut voice, Effect::KeyOff(2), 2);
        assert!(!voice.released);
        run_row(&mut voice, Effect::KeyOff(2), 3);
        assert!(voice.released);
        assert_eq!(voice.volume, 0);
    }

    #[test]
    fn pattern_loop_counts_down() {
        let mut voice = sounding(64);
        let mut globals = Globals::default();
        let set = RowContext { row: 4, ..RowContext::default() };
        voice.apply_row_effect(Effect::PatternLoop(0), &set, &mut globals, &mut FlowControl::default());
        let at = RowContext { row: 8, ..RowContext::default() };
        let mut jumps = 0;
        for _ in 0..3 {
            let mut flow = FlowControl::default();
            voice.apply_row_effect(Effect::PatternLoop(2), &at, &mut globals, &mut flow);
            if flow.loop_to == Some(4) {
                jumps += 1;
            }
        }
        // two repeats, then fall through
        assert_eq!(jumps, 2);
    }

    #[test]
    fn volume_column_panning_and_slides() {
        let mut voice = sounding(20);
        voice.apply_volume_row(VolumeCommand::Panning(0xF));
        assert_eq!(voice.panning, 240);
        voice.apply_volume_tick(VolumeCommand::VolumeSlideUp(5));
        assert_eq!(voice.volume, 25);
        voice.apply_volume_row(VolumeCommand::Volume(70));
        assert_eq!(voice.volume, 64);
    }
}
