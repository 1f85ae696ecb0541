//! Runtime evaluator for instrument envelopes.

use xp_ir::Envelope;

/// Playback position inside a volume or panning envelope.
///
/// Advances one envelope tick per sequencer tick. Holds at the sustain
/// point until the note is released, and wraps between the loop points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeState {
    tick: u16,
}

impl EnvelopeState {
    /// Restart from the first point.
    pub fn reset(&mut self) {
        self.tick = 0;
    }

    /// Jump to an absolute envelope tick.
    pub fn set_tick(&mut self, tick: u16) {
        self.tick = tick;
    }

    pub fn tick(&self) -> u16 {
        self.tick
    }

    /// Current value, or `default` when the envelope is off.
    pub fn value(&self, envelope: &Envelope, default: u8) -> u8 {
        if envelope.is_active() {
            envelope.value_at(self.tick)
        } else {
            default
        }
    }

    /// Advance by one tick.
    pub fn advance(&mut self, envelope: &Envelope, released: bool) {
        if !envelope.is_active() {
            return;
        }
        if !released && envelope.sustain_tick() == Some(self.tick) {
            return;
        }

        let next = self.tick.saturating_add(1);
        if let Some((start, end)) = envelope.loop_ticks() {
            if next > end && self.tick <= end {
                self.tick = start;
                return;
            }
        }
        self.tick = next.min(envelope.last_tick());
    }
}
