//! Playback engine for the xmplay tracker.
//!
//! The sequencer walks the order table and plays pattern rows, the
//! effect processor updates channel voices every tick, and the mixer
//! sums the voices into stereo frames.

extern crate alloc;

mod effects;
mod engine;
mod envelope_state;
mod frame;
mod frequency;
mod mixer;
mod sequencer;
mod voice;

pub use effects::{retrigger_volume, sine, FlowControl, Globals, RowContext};
pub use engine::{frames_per_tick, Engine};
pub use envelope_state::EnvelopeState;
pub use frame::Frame;
pub use frequency::{note_to_period, period_to_frequency, period_to_increment};
pub use mixer::{Mixer, UNITY_Q15};
pub use sequencer::{Position, Sequencer};
pub use voice::{ChannelVoice, EffectMemory, FADEOUT_FULL};
