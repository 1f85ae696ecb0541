//! Voice mixing into stereo frames.

use xp_ir::Module;

use crate::frame::Frame;
use crate::voice::ChannelVoice;

/// Frames accumulated per pass before clamping.
const CHUNK: usize = 256;

/// Unity in Q15.
pub const UNITY_Q15: i32 = 1 << 15;

/// Sums active voices into a stereo buffer with 32-bit accumulation.
#[derive(Clone, Debug)]
pub struct Mixer {
    /// Output-stage gain in Q15, from the player's volume and fades
    master: i32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self { master: UNITY_Q15 }
    }
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the master gain (Q15, clamped to 0..=unity).
    pub fn set_master(&mut self, q15: i32) {
        self.master = q15.clamp(0, UNITY_Q15);
    }

    pub fn master(&self) -> i32 {
        self.master
    }

    /// Left and right Q15 gains for a voice.
    ///
    /// Voice volume, envelope and global volume are 0-64 each and fadeout
    /// is 0-65536, so their product over 2^19 lands in Q15.
    pub fn gains(&self, voice: &ChannelVoice, global_volume: u8) -> (i64, i64) {
        let v = voice.out_volume.min(64) as i64;
        let e = voice.envelope_volume.min(64) as i64;
        let g = global_volume.min(64) as i64;
        let amp = (v * e * g * voice.fadeout as i64) >> 19;
        let amp = amp * self.master as i64 >> 15;
        let pan = voice.out_panning as i64;
        (amp * (255 - pan) / 255, amp * pan / 255)
    }

    /// Mix every active voice into `out`, overwriting its contents.
    pub fn mix(
        &self,
        voices: &mut [ChannelVoice],
        module: &Module,
        global_volume: u8,
        out: &mut [Frame],
    ) {
        for chunk in out.chunks_mut(CHUNK) {
            let mut left = [0i32; CHUNK];
            let mut right = [0i32; CHUNK];
            let frames = chunk.len();

            for voice in voices.iter_mut() {
                if !voice.active {
                    continue;
                }
                let Some(sample) = voice.sample.and_then(|h| module.sample(h)) else {
                    voice.active = false;
                    continue;
                };
                if sample.is_empty() {
                    voice.active = false;
                    continue;
                }

                let (gl, gr) = self.gains(voice, global_volume);
                for i in 0..frames {
                    if !voice.active {
                        break;
                    }
                    let s = voice.fetch(sample) as i64;
                    left[i] += (s * gl >> 15) as i32;
                    right[i] += (s * gr >> 15) as i32;
                    voice.advance(sample);
                }
            }

            for (i, frame) in chunk.iter_mut().enumerate() {
                *frame = Frame::from_accumulator(left[i], right[i]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use xp_ir::{Instrument, LoopType, Sample, SampleData, SampleHandle};

    fn module_with(data: SampleData) -> Module {
        let mut sample = Sample::new("s");
        sample.data = data;
        sample.loop_type = LoopType::Forward;
        sample.loop_length = sample.len() as u32;
        let mut inst = Instrument::new("i");
        inst.samples.push(sample);
        let mut module = Module::default();
        module.instruments.push(inst);
        module
    }

    fn full_voice(pan: u8) -> ChannelVoice {
        let mut voice = ChannelVoice::new();
        voice.sample = Some(SampleHandle { instrument: 0, sample: 0 });
        voice.retrigger();
        voice.volume = 64;
        voice.out_volume = 64;
        voice.out_panning = pan;
        voice.step = 1 << 16;
        voice
    }

    #[test]
    fn full_scale_gain_is_unity() {
        let mixer = Mixer::new();
        let (l, r) = mixer.gains(&full_voice(0), 64);
        assert_eq!(l, UNITY_Q15 as i64);
        assert_eq!(r, 0);
    }

    #[test]
    fn center_pan_splits_evenly() {
        let mixer = Mixer::new();
        let (l, r) = mixer.gains(&full_voice(128), 64);
        assert!((l - r).abs() <= UNITY_Q15 as i64 / 128);
    }

    #[test]
    fn two_full_scale_voices_clamp() {
        let module = module_with(SampleData::Pcm16(vec![i16::MAX; 8]));
        let mut voices = vec![full_voice(0), full_voice(0)];
        let mut out = [Frame::silence(); 4];
        Mixer::new().mix(&mut voices, &module, 64, &mut out);
        for frame in out {
            assert_eq!(frame.left, i16::MAX);
            assert_eq!(frame.right, 0);
        }
    }

    #[test]
    fn master_and_global_volume_scale_output() {
        let module = module_with(SampleData::Pcm16(vec![16384; 8]));
        let mut mixer = Mixer::new();
        mixer.set_master(UNITY_Q15 / 2);
        let mut voices = vec![full_voice(0)];
        let mut out = [Frame::silence(); 2];
        mixer.mix(&mut voices, &module, 32, &mut out);
        assert_eq!(out[0].left, 4096);
    }

    #[test]
    fn inactive_voices_are_silent() {
        let module = module_with(SampleData::Pcm8(vec![100; 8]));
        let mut voice = full_voice(128);
        voice.active = false;
        let mut out = [Frame::mono(7); 300];
        Mixer::new().mix(&mut [voice], &module, 64, &mut out);
        assert!(out.iter().all(|f| *f == Frame::silence()));
    }

    #[test]
    fn one_shot_voice_stops_mid_buffer() {
        let mut module = module_with(SampleData::Pcm8(vec![64; 4]));
        module.instruments[0].samples[0].loop_type = LoopType::None;
        let mut voices = vec![full_voice(0)];
        let mut out = [Frame::silence(); 8];
        Mixer::new().mix(&mut voices, &module, 64, &mut out);
        assert_ne!(out[3].left, 0);
        assert_eq!(out[4].left, 0);
        assert!(!voices[0].active);
    }
}
