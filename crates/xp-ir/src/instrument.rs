//! Instrument and envelope types.

use alloc::vec::Vec;
use arrayvec::{ArrayString, ArrayVec};

use crate::sample::Sample;

/// Maximum points in one envelope.
pub const MAX_ENVELOPE_POINTS: usize = 12;

/// An instrument definition.
#[derive(Clone, Debug)]
pub struct Instrument {
    /// Instrument name
    pub name: ArrayString<22>,
    /// Sample mapping: note (0-95, i.e. note - 1) -> index into `samples`
    pub sample_map: [u8; 96],
    /// Volume envelope
    pub volume_envelope: Envelope,
    /// Panning envelope
    pub panning_envelope: Envelope,
    /// Auto-vibrato settings
    pub vibrato: AutoVibrato,
    /// Volume fadeout per tick after key-off (0 = no fade)
    pub fadeout: u16,
    /// Samples owned by this instrument
    pub samples: Vec<Sample>,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            sample_map: [0; 96],
            volume_envelope: Envelope::default(),
            panning_envelope: Envelope::default(),
            vibrato: AutoVibrato::default(),
            fadeout: 0,
            samples: Vec::new(),
        }
    }
}

impl Instrument {
    /// Create a new instrument with default settings.
    pub fn new(name: &str) -> Self {
        let mut inst = Self::default();
        let _ = inst.name.try_push_str(name);
        inst
    }

    /// Set all notes to map to a single sample.
    pub fn set_single_sample(&mut self, sample_index: u8) {
        self.sample_map.fill(sample_index);
    }

    /// Index of the sample played for `note` (1-96), if it exists.
    pub fn sample_for_note(&self, note: u8) -> Option<usize> {
        let slot = *self.sample_map.get(note.checked_sub(1)? as usize)? as usize;
        (slot < self.samples.len()).then_some(slot)
    }
}

/// Automatic per-instrument vibrato.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutoVibrato {
    /// Waveform (0 = sine, 1 = square, 2 = ramp down, 3 = ramp up)
    pub waveform: u8,
    /// Ticks before full depth is reached
    pub sweep: u8,
    pub depth: u8,
    pub rate: u8,
}

/// A volume or panning envelope.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Envelope points, ordered by tick
    pub points: ArrayVec<EnvelopePoint, MAX_ENVELOPE_POINTS>,
    /// Sustain point index
    pub sustain_point: u8,
    /// Loop start point index
    pub loop_start: u8,
    /// Loop end point index
    pub loop_end: u8,
    /// Is the envelope enabled?
    pub enabled: bool,
    pub sustain_enabled: bool,
    pub loop_enabled: bool,
}

impl Envelope {
    /// Create a new empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point to the envelope. Points past the limit are dropped.
    pub fn add_point(&mut self, tick: u16, value: u8) {
        let _ = self.points.try_push(EnvelopePoint { tick, value });
    }

    /// Returns true if the envelope is enabled and has points to follow.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.points.is_empty()
    }

    /// Tick of point `index`, if it exists.
    pub fn tick_of(&self, index: u8) -> Option<u16> {
        self.points.get(index as usize).map(|p| p.tick)
    }

    /// Tick of the sustain point, if sustain is on.
    pub fn sustain_tick(&self) -> Option<u16> {
        if self.sustain_enabled {
            self.tick_of(self.sustain_point)
        } else {
            None
        }
    }

    /// Loop range as (start tick, end tick), if looping is on.
    pub fn loop_ticks(&self) -> Option<(u16, u16)> {
        if !self.loop_enabled {
            return None;
        }
        let start = self.tick_of(self.loop_start)?;
        let end = self.tick_of(self.loop_end)?;
        (end >= start).then_some((start, end))
    }

    /// Tick of the last point.
    pub fn last_tick(&self) -> u16 {
        self.points.last().map_or(0, |p| p.tick)
    }

    /// Get the interpolated value at a given tick.
    pub fn value_at(&self, tick: u16) -> u8 {
        let Some(first) = self.points.first() else {
            return 0;
        };

        let mut prev = first;
        for point in &self.points {
            if point.tick > tick {
                if point.tick <= prev.tick {
                    return point.value;
                }
                let t = (tick - prev.tick) as i32;
                let d = (point.tick - prev.tick) as i32;
                let v = prev.value as i32 + (point.value as i32 - prev.value as i32) * t / d;
                return v as u8;
            }
            prev = point;
        }

        // Past the last point
        prev.value
    }
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Tick position
    pub tick: u16,
    /// Value (0-64)
    pub value: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_interpolation() {
        let mut env = Envelope::new();
        env.add_point(0, 64);
        env.add_point(100, 0);

        assert_eq!(env.value_at(0), 64);
        assert_eq!(env.value_at(50), 32);
        assert_eq!(env.value_at(100), 0);
        assert_eq!(env.value_at(200), 0); // Past end
    }

    #[test]
    fn envelope_holds_twelve_points() {
        let mut env = Envelope::new();
        for i in 0..20 {
            env.add_point(i * 4, 32);
        }
        assert_eq!(env.points.len(), MAX_ENVELOPE_POINTS);
        assert_eq!(env.last_tick(), 44);
    }

    #[test]
    fn sustain_and_loop_need_flags() {
        let mut env = Envelope::new();
        env.add_point(0, 0);
        env.add_point(10, 64);
        env.add_point(20, 32);
        env.sustain_point = 1;
        env.loop_start = 1;
        env.loop_end = 2;
        assert_eq!(env.sustain_tick(), None);
        assert_eq!(env.loop_ticks(), None);
        env.sustain_enabled = true;
        env.loop_enabled = true;
        assert_eq!(env.sustain_tick(), Some(10));
        assert_eq!(env.loop_ticks(), Some((10, 20)));
    }

    #[test]
    fn sample_lookup_checks_bounds() {
        let mut inst = Instrument::new("lead");
        inst.samples.push(Sample::new("a"));
        inst.sample_map[10] = 3;
        assert_eq!(inst.sample_for_note(1), Some(0));
        assert_eq!(inst.sample_for_note(11), None);
        assert_eq!(inst.sample_for_note(0), None);
        assert_eq!(inst.sample_for_note(97), None);
    }
}
