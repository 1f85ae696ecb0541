//! Note-to-frequency conversion for sample playback.
//!
//! Pitch is tracked as a linear period: 64 units per semitone, 768 per
//! octave, with C-4 (note 49) at period 4608 playing the sample at
//! 8363 Hz. The period is converted to a 16.16 fixed-point increment
//! for stepping through sample data.

/// Period of C-4, the note that plays a sample at its base rate.
const C4_PERIOD: i32 = 4608;

/// Sample rate of an untransposed sample at C-4.
const C4_RATE: f64 = 8363.0;

/// Period units per semitone.
pub const SEMITONE: i32 = 64;

/// Lowest allowed period (highest pitch).
pub const PERIOD_MIN: i32 = 1;

/// Highest allowed period (lowest pitch).
pub const PERIOD_MAX: i32 = 32000;

/// Linear period for a note (1-based, relative note already applied)
/// and a finetune in 1/128 semitone steps.
pub fn note_to_period(note: i16, finetune: i8) -> i32 {
    let period = 7680 - (note as i32 - 1) * SEMITONE - finetune as i32 / 2;
    clamp_period(period)
}

/// Clamp a period to the playable range.
pub fn clamp_period(period: i32) -> i32 {
    period.clamp(PERIOD_MIN, PERIOD_MAX)
}

/// Playback frequency in Hz for a period.
pub fn period_to_frequency(period: i32) -> f64 {
    C4_RATE * libm::exp2((C4_PERIOD - period) as f64 / 768.0)
}

/// Convert a period to a 16.16 fixed-point increment at `sample_rate`.
pub fn period_to_increment(period: i32, sample_rate: u32) -> u32 {
    if sample_rate == 0 {
        return 0;
    }
    let step = period_to_frequency(clamp_period(period)) * 65536.0 / sample_rate as f64;
    step.min(u32::MAX as f64) as u32
}
