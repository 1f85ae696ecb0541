//! Effect command types for pattern events.
//!
//! Slide-style commands keep their raw parameter byte: a zero parameter
//! means "reuse the last value on this channel", which only the engine
//! can resolve.

/// Volume column command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeCommand {
    #[default]
    None,
    /// Set volume (0-64)
    Volume(u8),
    VolumeSlideDown(u8),
    VolumeSlideUp(u8),
    FineVolumeSlideDown(u8),
    FineVolumeSlideUp(u8),
    VibratoSpeed(u8),
    VibratoDepth(u8),
    /// Set panning (0-15, scaled to 0-240)
    Panning(u8),
    PanningSlideLeft(u8),
    PanningSlideRight(u8),
    TonePorta(u8),
}

impl VolumeCommand {
    /// Decode a volume column byte.
    pub const fn from_raw(raw: u8) -> Self {
        let lo = raw & 0x0F;
        match raw {
            0x10..=0x50 => VolumeCommand::Volume(raw - 0x10),
            0x60..=0x6F => VolumeCommand::VolumeSlideDown(lo),
            0x70..=0x7F => VolumeCommand::VolumeSlideUp(lo),
            0x80..=0x8F => VolumeCommand::FineVolumeSlideDown(lo),
            0x90..=0x9F => VolumeCommand::FineVolumeSlideUp(lo),
            0xA0..=0xAF => VolumeCommand::VibratoSpeed(lo),
            0xB0..=0xBF => VolumeCommand::VibratoDepth(lo),
            0xC0..=0xCF => VolumeCommand::Panning(lo),
            0xD0..=0xDF => VolumeCommand::PanningSlideLeft(lo),
            0xE0..=0xEF => VolumeCommand::PanningSlideRight(lo),
            0xF0..=0xFF => VolumeCommand::TonePorta(lo),
            _ => VolumeCommand::None,
        }
    }

    /// Returns the variant name as a static string (ignoring parameters).
    pub fn name(&self) -> &'static str {
        match self {
            VolumeCommand::None => "None",
            VolumeCommand::Volume(_) => "Volume",
            VolumeCommand::VolumeSlideDown(_) => "VolumeSlideDown",
            VolumeCommand::VolumeSlideUp(_) => "VolumeSlideUp",
            VolumeCommand::FineVolumeSlideDown(_) => "FineVolumeSlideDown",
            VolumeCommand::FineVolumeSlideUp(_) => "FineVolumeSlideUp",
            VolumeCommand::VibratoSpeed(_) => "VibratoSpeed",
            VolumeCommand::VibratoDepth(_) => "VibratoDepth",
            VolumeCommand::Panning(_) => "Panning",
            VolumeCommand::PanningSlideLeft(_) => "PanningSlideLeft",
            VolumeCommand::PanningSlideRight(_) => "PanningSlideRight",
            VolumeCommand::TonePorta(_) => "TonePorta",
        }
    }
}

/// Effect column command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,

    // === Pitch ===
    /// Cycle between note, note+x, note+y each tick
    Arpeggio { x: u8, y: u8 },
    PortaUp(u8),
    PortaDown(u8),
    /// Slide toward the row's note without retriggering
    TonePorta(u8),
    Vibrato { speed: u8, depth: u8 },
    TonePortaVolumeSlide(u8),
    VibratoVolumeSlide(u8),

    // === Volume & panning ===
    Tremolo { speed: u8, depth: u8 },
    /// Set panning (0-255)
    SetPan(u8),
    /// Start the sample at param * 256 frames
    SampleOffset(u8),
    VolumeSlide(u8),
    /// Set voice volume (0-64)
    SetVolume(u8),
    PanningSlide(u8),

    // === Flow ===
    /// Jump to order position
    PositionJump(u8),
    /// Continue at this row of the next order position; the parameter
    /// is read as a decimal row number less one, floored at 0
    PatternBreak(u8),
    /// Ticks per row (1-31)
    SetSpeed(u8),
    /// Beats per minute (32-255)
    SetTempo(u8),

    // === Global ===
    /// Set global volume (0-64)
    SetGlobalVolume(u8),
    GlobalVolumeSlide(u8),

    // === Envelope / release ===
    /// Release the note on the given tick
    KeyOff(u8),
    SetEnvelopePosition(u8),

    // === Retrigger family ===
    /// Retrigger every `interval` ticks, changing volume by rule `volume`
    MultiRetrigger { interval: u8, volume: u8 },
    /// Audible for `on`+1 ticks, silent for `off`+1 ticks
    Tremor { on: u8, off: u8 },

    // === Extended (Exy) ===
    FinePortaUp(u8),
    FinePortaDown(u8),
    /// 0 = set loop start, n = loop n times
    PatternLoop(u8),
    RetriggerNote(u8),
    FineVolumeSlideUp(u8),
    FineVolumeSlideDown(u8),
    NoteCut(u8),
    NoteDelay(u8),
    PatternDelay(u8),

    // === Extra fine (X1y/X2y) ===
    ExtraFinePortaUp(u8),
    ExtraFinePortaDown(u8),
}

impl Effect {
    /// Decode an effect id and parameter. Unknown ids decode to `None`.
    pub const fn from_raw(effect: u8, param: u8) -> Self {
        let hi = param >> 4;
        let lo = param & 0x0F;
        match effect {
            0x00 if param != 0 => Effect::Arpeggio { x: hi, y: lo },
            0x01 => Effect::PortaUp(param),
            0x02 => Effect::PortaDown(param),
            0x03 => Effect::TonePorta(param),
            0x04 => Effect::Vibrato { speed: hi, depth: lo },
            0x05 => Effect::TonePortaVolumeSlide(param),
            0x06 => Effect::VibratoVolumeSlide(param),
            0x07 => Effect::Tremolo { speed: hi, depth: lo },
            0x08 => Effect::SetPan(param),
            0x09 => Effect::SampleOffset(param),
            0x0A => Effect::VolumeSlide(param),
            0x0B => Effect::PositionJump(param),
            0x0C => Effect::SetVolume(if param > 64 { 64 } else { param }),
            0x0D => Effect::PatternBreak((hi * 10 + lo).saturating_sub(1)),
            0x0E => Self::extended(hi, lo),
            0x0F if param < 32 => Effect::SetSpeed(param),
            0x0F => Effect::SetTempo(param),
            // G
            0x10 => Effect::SetGlobalVolume(if param > 64 { 64 } else { param }),
            // H
            0x11 => Effect::GlobalVolumeSlide(param),
            // K
            0x14 => Effect::KeyOff(param),
            // L
            0x15 => Effect::SetEnvelopePosition(param),
            // P
            0x19 => Effect::PanningSlide(param),
            // R
            0x1B => Effect::MultiRetrigger { interval: lo, volume: hi },
            // T
            0x1D => Effect::Tremor { on: hi, off: lo },
            // X
            0x21 if hi == 1 => Effect::ExtraFinePortaUp(lo),
            0x21 if hi == 2 => Effect::ExtraFinePortaDown(lo),
            _ => Effect::None,
        }
    }

    const fn extended(cmd: u8, val: u8) -> Self {
        match cmd {
            0x1 => Effect::FinePortaUp(val),
            0x2 => Effect::FinePortaDown(val),
            0x6 => Effect::PatternLoop(val),
            0x9 => Effect::RetriggerNote(val),
            0xA => Effect::FineVolumeSlideUp(val),
            0xB => Effect::FineVolumeSlideDown(val),
            0xC => Effect::NoteCut(val),
            0xD => Effect::NoteDelay(val),
            0xE => Effect::PatternDelay(val),
            _ => Effect::None,
        }
    }

    /// Returns the variant name as a static string (ignoring parameters).
    pub fn name(&self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::Arpeggio { .. } => "Arpeggio",
            Effect::PortaUp(_) => "PortaUp",
            Effect::PortaDown(_) => "PortaDown",
            Effect::TonePorta(_) => "TonePorta",
            Effect::Vibrato { .. } => "Vibrato",
            Effect::TonePortaVolumeSlide(_) => "TonePortaVolumeSlide",
            Effect::VibratoVolumeSlide(_) => "VibratoVolumeSlide",
            Effect::Tremolo { .. } => "Tremolo",
            Effect::SetPan(_) => "SetPan",
            Effect::SampleOffset(_) => "SampleOffset",
            Effect::VolumeSlide(_) => "VolumeSlide",
            Effect::SetVolume(_) => "SetVolume",
            Effect::PanningSlide(_) => "PanningSlide",
            Effect::PositionJump(_) => "PositionJump",
            Effect::PatternBreak(_) => "PatternBreak",
            Effect::SetSpeed(_) => "SetSpeed",
            Effect::SetTempo(_) => "SetTempo",
            Effect::SetGlobalVolume(_) => "SetGlobalVolume",
            Effect::GlobalVolumeSlide(_) => "GlobalVolumeSlide",
            Effect::KeyOff(_) => "KeyOff",
            Effect::SetEnvelopePosition(_) => "SetEnvelopePosition",
            Effect::MultiRetrigger { .. } => "MultiRetrigger",
            Effect::Tremor { .. } => "Tremor",
            Effect::FinePortaUp(_) => "FinePortaUp",
            Effect::FinePortaDown(_) => "FinePortaDown",
            Effect::PatternLoop(_) => "PatternLoop",
            Effect::RetriggerNote(_) => "RetriggerNote",
            Effect::FineVolumeSlideUp(_) => "FineVolumeSlideUp",
            Effect::FineVolumeSlideDown(_) => "FineVolumeSlideDown",
            Effect::NoteCut(_) => "NoteCut",
            Effect::NoteDelay(_) => "NoteDelay",
            Effect::PatternDelay(_) => "PatternDelay",
            Effect::ExtraFinePortaUp(_) => "ExtraFinePortaUp",
            Effect::ExtraFinePortaDown(_) => "ExtraFinePortaDown",
        }
    }

    /// Returns true if this effect only acts on tick 0.
    pub fn is_row_effect(&self) -> bool {
        matches!(
            self,
            Effect::SetPan(_)
                | Effect::SampleOffset(_)
                | Effect::SetVolume(_)
                | Effect::PositionJump(_)
                | Effect::PatternBreak(_)
                | Effect::SetSpeed(_)
                | Effect::SetTempo(_)
                | Effect::SetGlobalVolume(_)
                | Effect::SetEnvelopePosition(_)
                | Effect::FinePortaUp(_)
                | Effect::FinePortaDown(_)
                | Effect::FineVolumeSlideUp(_)
                | Effect::FineVolumeSlideDown(_)
                | Effect::ExtraFinePortaUp(_)
                | Effect::ExtraFinePortaDown(_)
                | Effect::PatternLoop(_)
                | Effect::PatternDelay(_)
        ) || matches!(self, Effect::KeyOff(0))
    }
}
