//! Core module types for the xmplay tracker engine.
//!
//! This crate defines the in-memory form of a loaded Extended Module:
//! header, raw and unpacked patterns, instruments and their samples.
//! The loader in `xp-formats` produces a [`Module`]; the engine only
//! ever reads it.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
mod effects;
mod event;
mod header;
mod instrument;
mod module;
mod pattern;
mod sample;

pub use analysis::{summarize, ModuleFeatures, SampleStats};
pub use effects::{Effect, VolumeCommand};
pub use event::{Event, Note, NOTE_KEY_OFF, NOTE_MAX};
pub use header::{ModuleHeader, MAX_CHANNELS, MAX_INSTRUMENTS, MAX_PATTERNS, MAX_SONG_LENGTH};
pub use instrument::{AutoVibrato, Envelope, EnvelopePoint, Instrument, MAX_ENVELOPE_POINTS};
pub use module::{Module, SampleHandle};
pub use pattern::{Pattern, UnpackedPattern, MAX_ROWS};
pub use sample::{LoopType, Sample, SampleData};
