//! Main playback engine.

use xp_ir::Module;

use crate::frame::Frame;
use crate::mixer::Mixer;
use crate::sequencer::{Position, Sequencer};

/// Output frames per tick in 16.16 fixed point: one tick lasts 2.5 / bpm
/// seconds.
pub fn frames_per_tick(sample_rate: u32, bpm: u16) -> u64 {
    (sample_rate as u64 * 5 * 65536) / (2 * bpm.max(1) as u64)
}

/// The main playback engine.
///
/// Owns the loaded module and renders it block by block. Ticks fall on
/// exact frame boundaries inside a block; the fractional part of the
/// tick length carries over so tempo stays accurate over time.
pub struct Engine {
    module: Module,
    sequencer: Sequencer,
    mixer: Mixer,
    /// Audio sample rate (e.g., 44100)
    sample_rate: u32,
    /// Frames left before the next tick (16.16)
    until_tick: u64,
    /// Is playback active?
    playing: bool,
}

impl Engine {
    /// Create a new engine for the given module. A zero rate is raised
    /// to 1 Hz.
    pub fn new(module: Module, sample_rate: u32) -> Self {
        let sequencer = Sequencer::new(&module);
        Self {
            module,
            sequencer,
            mixer: Mixer::new(),
            sample_rate: sample_rate.max(1),
            until_tick: 0,
            playing: false,
        }
    }

    /// Start playback.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop playback and rewind to the start of the song.
    pub fn stop(&mut self) {
        self.playing = false;
        self.sequencer.reset(&self.module);
        self.until_tick = 0;
    }

    /// Jump to an order position. Sounding voices are cut.
    pub fn goto(&mut self, sequence: u16) {
        self.sequencer.reset_voices();
        self.sequencer.goto(sequence, &self.module);
        self.until_tick = 0;
    }

    /// Cut every voice without moving the song position.
    pub fn reset_voices(&mut self) {
        self.sequencer.reset_voices();
    }

    /// Set the output gain in Q15 (32768 = unity).
    pub fn set_master_volume(&mut self, q15: i32) {
        self.mixer.set_master(q15);
    }

    /// Fill `out` with the next frames of the song. Silence while stopped.
    pub fn render(&mut self, out: &mut [Frame]) {
        if !self.playing {
            out.fill(Frame::silence());
            return;
        }

        let mut offset = 0;
        while offset < out.len() {
            if self.until_tick < 1 << 16 {
                self.sequencer.tick(&self.module, self.sample_rate);
                self.until_tick += frames_per_tick(self.sample_rate, self.sequencer.bpm());
                continue;
            }

            let frames = ((self.until_tick >> 16) as usize).min(out.len() - offset);
            let global = self.sequencer.global_volume();
            self.mixer.mix(
                self.sequencer.voices_mut(),
                &self.module,
                global,
                &mut out[offset..offset + frames],
            );
            self.until_tick -= (frames as u64) << 16;
            offset += frames;
        }
    }

    /// Get the current playback position.
    pub fn position(&self) -> Position {
        self.sequencer.position()
    }

    /// Is playback active?
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bpm(&self) -> u16 {
        self.sequencer.bpm()
    }

    pub fn tempo(&self) -> u16 {
        self.sequencer.tempo()
    }

    /// Number of voices currently producing audio.
    pub fn active_voices(&self) -> usize {
        self.sequencer.voices().iter().filter(|v| v.active).count()
    }
}
