//! Pattern events.

use crate::effects::{Effect, VolumeCommand};

/// Highest playable note value (B-7).
pub const NOTE_MAX: u8 = 96;

/// Note value that releases the sounding note.
pub const NOTE_KEY_OFF: u8 = 97;

/// Decoded view of an event's note byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    /// No note
    #[default]
    None,
    /// Note on, 1-96 (1 = C-0)
    On(u8),
    /// Key release
    Off,
}

impl Note {
    /// Decode a raw note byte. Values above 97 are treated as empty.
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1..=NOTE_MAX => Note::On(raw),
            NOTE_KEY_OFF => Note::Off,
            _ => Note::None,
        }
    }

    /// Get the octave (0-7) if this is a note on.
    pub const fn octave(self) -> Option<u8> {
        match self {
            Note::On(n) => Some((n - 1) / 12),
            _ => None,
        }
    }

    /// Get the semitone (0-11) if this is a note on.
    pub const fn semitone(self) -> Option<u8> {
        match self {
            Note::On(n) => Some((n - 1) % 12),
            _ => None,
        }
    }
}

/// One cell of an unpacked pattern, exactly as stored in the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Event {
    /// 0 = none, 1-96 = pitch, 97 = key off
    pub note: u8,
    /// Instrument number (0 = none, 1-128)
    pub instrument: u8,
    /// Volume column byte
    pub volume: u8,
    /// Effect id
    pub effect: u8,
    /// Effect parameter
    pub param: u8,
}

impl Event {
    /// Create an empty event.
    pub const fn empty() -> Self {
        Self { note: 0, instrument: 0, volume: 0, effect: 0, param: 0 }
    }

    /// Returns true if the event carries nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Decoded note column.
    pub fn note(&self) -> Note {
        Note::from_raw(self.note)
    }

    /// Decoded effect column.
    pub fn effect(&self) -> Effect {
        Effect::from_raw(self.effect, self.param)
    }

    /// Decoded volume column.
    pub fn volume_command(&self) -> VolumeCommand {
        VolumeCommand::from_raw(self.volume)
    }
}
