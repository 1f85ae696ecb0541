//! Per-channel voice state: the note currently sounding on a channel.

use xp_ir::{Event, Sample, SampleHandle};

use crate::envelope_state::EnvelopeState;

/// Full fadeout volume; counts down after key-off.
pub const FADEOUT_FULL: u32 = 65536;

/// Last non-zero parameters, reused when an effect is given a zero parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectMemory {
    pub volume_slide: u8,
    pub fine_volume_up: u8,
    pub fine_volume_down: u8,
    pub porta_up: u8,
    pub porta_down: u8,
    pub fine_porta_up: u8,
    pub fine_porta_down: u8,
    pub extra_fine_porta_up: u8,
    pub extra_fine_porta_down: u8,
    pub tone_porta: u8,
    pub panning_slide: u8,
    pub global_volume_slide: u8,
    pub sample_offset: u8,
    pub retrigger: u8,
    pub tremor: u8,
}

/// Mixing and effect state for a single channel.
#[derive(Clone, Debug)]
pub struct ChannelVoice {
    /// Is the voice producing audio?
    pub active: bool,
    /// The sounding sample, by arena index
    pub sample: Option<SampleHandle>,
    /// Last instrument number used on this channel (1-based, 0 = none)
    pub instrument: u8,
    /// Last note played (1-96, before relative note)
    pub note: u8,

    /// Position in sample frames (16.16 fixed-point)
    pub position: u64,
    /// Increment per output frame (16.16 fixed-point)
    pub step: u32,
    /// Moving backwards through a ping-pong loop
    pub backwards: bool,

    // Pitch
    /// Base linear period
    pub period: i32,
    /// Transient offset from vibrato/arpeggio, cleared every tick
    pub period_offset: i32,
    /// Tone portamento destination
    pub target_period: i32,
    pub finetune: i8,
    pub relative_note: i8,

    // Volume and panning
    /// Base volume (0-64)
    pub volume: u8,
    /// Volume after tremolo/tremor (0-64)
    pub out_volume: u8,
    /// Base panning (0-255)
    pub panning: u8,
    /// Panning after the panning envelope (0-255)
    pub out_panning: u8,

    // Active effect
    pub effect: u8,
    pub param: u8,
    pub volume_column: u8,

    // Modulation phases
    pub vibrato_phase: u8,
    pub vibrato_speed: u8,
    pub vibrato_depth: u8,
    pub tremolo_phase: u8,
    pub tremolo_speed: u8,
    pub tremolo_depth: u8,
    pub retrigger_counter: u8,
    pub tremor_counter: u8,
    pub tremor_silent: bool,

    // Envelopes and release
    pub volume_envelope: EnvelopeState,
    pub panning_envelope: EnvelopeState,
    /// Current volume envelope value (0-64)
    pub envelope_volume: u8,
    /// Current panning envelope value (0-64, 32 = center)
    pub envelope_panning: u8,
    /// Key-off received
    pub released: bool,
    /// Fadeout volume, `FADEOUT_FULL` until released
    pub fadeout: u32,

    // Flow
    pub loop_row: u16,
    pub loop_count: u8,
    /// Cell held back by a note delay
    pub delayed: Option<Event>,

    pub memory: EffectMemory,
}

impl Default for ChannelVoice {
    fn default() -> Self {
        Self {
            active: false,
            sample: None,
            instrument: 0,
            note: 0,
            position: 0,
            step: 0,
            backwards: false,
            period: 0,
            period_offset: 0,
            target_period: 0,
            finetune: 0,
            relative_note: 0,
            volume: 0,
            out_volume: 0,
            panning: 128,
            out_panning: 128,
            effect: 0,
            param: 0,
            volume_column: 0,
            vibrato_phase: 0,
            vibrato_speed: 0,
            vibrato_depth: 0,
            tremolo_phase: 0,
            tremolo_speed: 0,
            tremolo_depth: 0,
            retrigger_counter: 0,
            tremor_counter: 0,
            tremor_silent: false,
            volume_envelope: EnvelopeState::default(),
            panning_envelope: EnvelopeState::default(),
            envelope_volume: 64,
            envelope_panning: 32,
            released: false,
            fadeout: FADEOUT_FULL,
            loop_row: 0,
            loop_count: 0,
            delayed: None,
            memory: EffectMemory::default(),
        }
    }
}

impl ChannelVoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the voice at a new sample and take its defaults.
    pub fn load_sample(&mut self, handle: SampleHandle, sample: &Sample) {
        self.select_sample(handle, sample);
        self.reset_volume(sample);
    }

    /// Point the voice at a new sample, keeping the current volume.
    pub fn select_sample(&mut self, handle: SampleHandle, sample: &Sample) {
        self.sample = Some(handle);
        self.finetune = sample.finetune;
        self.relative_note = sample.relative_note;
    }

    /// Restore the sample's default volume and panning.
    pub fn reset_volume(&mut self, sample: &Sample) {
        self.volume = sample.volume.min(64);
        self.out_volume = self.volume;
        self.panning = sample.panning;
        self.out_panning = self.panning;
    }

    /// Restart the sample from the beginning with fresh envelopes.
    pub fn retrigger(&mut self) {
        self.position = 0;
        self.backwards = false;
        self.active = self.sample.is_some();
        self.released = false;
        self.fadeout = FADEOUT_FULL;
        self.volume_envelope.reset();
        self.panning_envelope.reset();
        self.envelope_volume = 64;
        self.envelope_panning = 32;
        self.retrigger_counter = 0;
        self.tremor_counter = 0;
        self.tremor_silent = false;
        self.vibrato_phase = 0;
        self.tremolo_phase = 0;
    }

    /// Release the note. Without a volume envelope the note is cut.
    pub fn key_off(&mut self, has_volume_envelope: bool) {
        self.released = true;
        if !has_volume_envelope {
            self.volume = 0;
            self.out_volume = 0;
        }
    }

    /// Silence and forget the current note.
    pub fn cut(&mut self) {
        self.active = false;
        self.volume = 0;
        self.out_volume = 0;
    }

    /// Effective period including transient modulation.
    pub fn effective_period(&self) -> i32 {
        self.period + self.period_offset
    }

    /// Linearly interpolated value at the current position.
    #[inline]
    pub fn fetch(&self, sample: &Sample) -> i16 {
        let idx = (self.position >> 16) as usize;
        let frac = (self.position & 0xFFFF) as u32;
        let mut next = idx + 1;
        if sample.has_loop() && next >= sample.loop_end() as usize {
            next = if self.backwards || sample.loop_type == xp_ir::LoopType::PingPong {
                idx
            } else {
                sample.loop_start as usize
            };
        }
        sample.data.interpolated(idx, next, frac)
    }

    /// Step the position by one output frame, wrapping or bouncing inside
    /// the loop. Deactivates the voice at the end of a one-shot sample.
    #[inline]
    pub fn advance(&mut self, sample: &Sample) {
        if !sample.has_loop() || sample.loop_end() <= sample.loop_start {
            self.position += self.step as u64;
            if self.position >> 16 >= sample.len() as u64 {
                self.active = false;
            }
            return;
        }

        let start = (sample.loop_start as u64) << 16;
        let end = (sample.loop_end() as u64) << 16;
        let length = end - start;
        let step = self.step as u64;

        match sample.loop_type {
            xp_ir::LoopType::PingPong => {
                // Unfold the bounce into a cycle of 2 * length: phases below
                // `length` run forward, the rest run back from the loop end.
                let unfolded = if self.position < start {
                    self.position += step;
                    if self.position < start {
                        return;
                    }
                    self.position - start
                } else if self.backwards {
                    2 * length - 1 - (self.position - start).min(length - 1) + step
                } else {
                    self.position - start + step
                };
                let phase = unfolded % (2 * length);

                self.backwards = phase >= length;
                self.position = if self.backwards {
                    start + (2 * length - 1 - phase)
                } else {
                    start + phase
                };
            }
            _ => {
                self.position += step;
                if self.position >= end {
                    self.position = start + (self.position - start) % length;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xp_ir::{LoopType, SampleData};

    fn test_sample(data: Vec<i8>) -> Sample {
        let mut s = Sample::new("test");
        s.data = SampleData::Pcm8(data);
        s
    }

    fn looping_sample(data: Vec<i8>, loop_start: u32, loop_length: u32, kind: LoopType) -> Sample {
        let mut s = test_sample(data);
        s.loop_start = loop_start;
        s.loop_length = loop_length;
        s.loop_type = kind;
        s
    }

    fn playing(step: u32) -> ChannelVoice {
        let mut v = ChannelVoice::new();
        v.sample = Some(SampleHandle { instrument: 0, sample: 0 });
        v.retrigger();
        v.step = step;
        v
    }

    #[test]
    fn stops_at_sample_end() {
        let sample = test_sample(vec![127; 2]);
        let mut voice = playing(1 << 16);
        voice.advance(&sample);
        assert!(voice.active);
        voice.advance(&sample);
        assert!(!voice.active);
    }

    #[test]
    fn loops_forward() {
        let sample = looping_sample(vec![100, 50, 25, 10], 1, 2, LoopType::Forward);
        let mut voice = playing(1 << 16);
        for _ in 0..10 {
            voice.advance(&sample);
            let idx = voice.position >> 16;
            assert!(voice.active);
            assert!(idx < 3, "position escaped loop: {}", idx);
        }
    }

    #[test]
    fn large_steps_stay_in_loop() {
        let sample = looping_sample(vec![0; 64], 16, 16, LoopType::Forward);
        let mut voice = playing(37 << 16);
        for _ in 0..100 {
            voice.advance(&sample);
            let idx = voice.position >> 16;
            assert!((16..32).contains(&idx), "index {}", idx);
        }
    }

    #[test]
    fn ping_pong_bounces() {
        let sample = looping_sample(vec![0; 8], 2, 4, LoopType::PingPong);
        let mut voice = playing(1 << 16);
        let mut seen = Vec::new();
        for _ in 0..12 {
            voice.advance(&sample);
            seen.push((voice.position >> 16) as u8);
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 5, 4, 3, 2, 2, 3, 4]);
        assert!(voice.active);
    }

    #[test]
    fn forward_loop_interpolates_across_wrap() {
        let sample = looping_sample(vec![0, 100, 0, 50], 1, 3, LoopType::Forward);
        let mut voice = playing(0);
        voice.position = (3 << 16) | 0x8000;
        // halfway between frame 3 (50 * 256) and loop start (100 * 256)
        assert_eq!(voice.fetch(&sample), 75 * 256);
    }

    #[test]
    fn key_off_without_envelope_cuts_volume() {
        let mut voice = playing(1 << 16);
        voice.volume = 40;
        voice.key_off(true);
        assert!(voice.released);
        assert_eq!(voice.volume, 40);
        voice.key_off(false);
        assert_eq!(voice.volume, 0);
    }
}
