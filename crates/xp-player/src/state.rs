//! State shared between the control surface and the scheduler thread.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;
use xp_engine::UNITY_Q15;

/// Full volume on the 0-64 scale used by every control.
pub const MAX_VOLUME: u8 = 64;

/// Where the worker last rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackPosition {
    /// Index into the order table
    pub sequence: u16,
    /// Pattern playing at that order position
    pub pattern: u8,
    pub row: u16,
}

/// A volume ramp toward a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    /// Current level, 0.0 to 64.0
    pub level: f32,
    /// Level the ramp is heading for
    pub target: f32,
    /// Change in level per millisecond; zero jumps straight to the target
    pub rate: f32,
    /// Volume chosen with `set_volume`, restored by fades in
    pub volume: f32,
}

impl Default for Fade {
    fn default() -> Self {
        let full = MAX_VOLUME as f32;
        Self { level: full, target: full, rate: 0.0, volume: full }
    }
}

impl Fade {
    /// Move the level toward the target by `elapsed` worth of ramp.
    pub fn step(&mut self, elapsed: Duration) {
        if self.rate <= 0.0 {
            self.level = self.target;
            return;
        }
        let delta = self.rate * elapsed.as_secs_f32() * 1000.0;
        self.level = if self.level < self.target {
            (self.level + delta).min(self.target)
        } else {
            (self.level - delta).max(self.target)
        };
    }

    /// Ramp down to silence over `ms`.
    pub fn fade_out(&mut self, ms: u32) {
        self.target = 0.0;
        self.rate = if ms == 0 { 0.0 } else { self.level / ms as f32 };
    }

    /// Ramp up from silence to the chosen volume over `ms`.
    pub fn fade_in(&mut self, ms: u32) {
        self.level = 0.0;
        self.target = self.volume;
        self.rate = if ms == 0 { 0.0 } else { self.volume / ms as f32 };
    }

    /// Choose a new volume; an active ramp carries on toward it.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME) as f32;
        self.target = self.volume;
    }

    /// Drop any ramp and sit at the chosen volume.
    pub fn reset(&mut self) {
        self.level = self.volume;
        self.target = self.volume;
        self.rate = 0.0;
    }

    /// A fade-out is still audible.
    pub fn is_fading_out(&self) -> bool {
        self.target < self.level
    }

    /// Time the current ramp still needs.
    pub fn remaining(&self) -> Duration {
        if self.rate <= 0.0 {
            return Duration::ZERO;
        }
        let ms = (self.level - self.target).abs() / self.rate;
        Duration::from_secs_f32(ms / 1000.0)
    }
}

/// Flags and targets written by control calls and read by the worker.
#[derive(Debug)]
pub struct EngineState {
    stop_requested: AtomicBool,
    playing: AtomicBool,
    paused: AtomicBool,
    muted: AtomicBool,
    /// Manual global volume ceiling (0-64), applied without a ramp
    ceiling: AtomicU8,
    fade: Mutex<Fade>,
    position: Mutex<PlaybackPosition>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            ceiling: AtomicU8::new(MAX_VOLUME),
            fade: Mutex::new(Fade::default()),
            position: Mutex::new(PlaybackPosition::default()),
        }
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Prepare for a new worker.
    pub fn rearm(&self) {
        self.stop_requested.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        *self.position.lock() = PlaybackPosition::default();
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Flip the mute flag, returning the new state.
    pub fn toggle_mute(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub fn set_ceiling(&self, volume: u8) {
        self.ceiling.store(volume.min(MAX_VOLUME), Ordering::Release);
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling.load(Ordering::Acquire)
    }

    /// Run `f` on the fade with the lock held.
    pub fn with_fade<R>(&self, f: impl FnOnce(&mut Fade) -> R) -> R {
        f(&mut self.fade.lock())
    }

    pub fn fade(&self) -> Fade {
        *self.fade.lock()
    }

    /// Advance the fade and return the output gain in Q15.
    pub fn step_gain(&self, elapsed: Duration) -> i32 {
        let level = self.with_fade(|fade| {
            fade.step(elapsed);
            fade.level
        });
        if self.is_muted() {
            return 0;
        }
        let gain = level / MAX_VOLUME as f32 * self.ceiling() as f32 / MAX_VOLUME as f32;
        (gain * UNITY_Q15 as f32) as i32
    }

    pub fn publish_position(&self, position: PlaybackPosition) {
        *self.position.lock() = position;
    }

    pub fn position(&self) -> PlaybackPosition {
        *self.position.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_out_reaches_zero_in_time() {
        let mut fade = Fade::default();
        fade.fade_out(100);
        assert!(fade.is_fading_out());
        fade.step(Duration::from_millis(50));
        assert!((fade.level - 32.0).abs() < 0.01);
        fade.step(Duration::from_millis(60));
        assert_eq!(fade.level, 0.0);
        assert!(!fade.is_fading_out());
    }

    #[test]
    fn fade_in_returns_to_chosen_volume() {
        let mut fade = Fade::default();
        fade.set_volume(32);
        fade.fade_in(10);
        assert_eq!(fade.level, 0.0);
        fade.step(Duration::from_millis(20));
        assert_eq!(fade.level, 32.0);
    }

    #[test]
    fn zero_length_fade_jumps() {
        let mut fade = Fade::default();
        fade.fade_out(0);
        fade.step(Duration::ZERO);
        assert_eq!(fade.level, 0.0);
    }

    #[test]
    fn remaining_time_tracks_ramp() {
        let mut fade = Fade::default();
        fade.fade_out(200);
        fade.step(Duration::from_millis(50));
        let left = fade.remaining().as_millis();
        assert!((149..=151).contains(&left), "{left}");
    }

    #[test]
    fn gain_combines_fade_ceiling_and_mute() {
        let state = EngineState::new();
        assert_eq!(state.step_gain(Duration::ZERO), UNITY_Q15);
        state.set_ceiling(32);
        assert_eq!(state.step_gain(Duration::ZERO), UNITY_Q15 / 2);
        assert!(state.toggle_mute());
        assert_eq!(state.step_gain(Duration::ZERO), 0);
        assert!(!state.toggle_mute());
        state.set_ceiling(200);
        assert_eq!(state.ceiling(), MAX_VOLUME);
    }
}
