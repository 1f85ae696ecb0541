//! Module summary: what a loaded module actually uses.
//!
//! Only patterns reachable through the order table are scanned, so the
//! report reflects what playback will hit rather than leftover data.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt;

use crate::event::{Event, Note};
use crate::module::Module;
use crate::sample::{LoopType, SampleData};

/// Counts over the module's instruments and samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleStats {
    pub pcm8: usize,
    pub pcm16: usize,
    pub forward_loops: usize,
    pub ping_pong_loops: usize,
    /// Instruments with an enabled volume envelope
    pub volume_envelopes: usize,
    /// Instruments with an enabled panning envelope
    pub panning_envelopes: usize,
}

/// Summary of a module as playback sees it.
#[derive(Clone, Debug, Default)]
pub struct ModuleFeatures {
    pub effects: BTreeSet<&'static str>,
    pub volume_commands: BTreeSet<&'static str>,
    pub note_range: Option<(u8, u8)>,
    pub total_notes: usize,
    pub key_offs: usize,
    pub instruments_used: BTreeSet<u8>,
    /// Per channel: true if any reachable cell is non-empty
    pub busy_channels: Vec<bool>,
    /// Stored patterns never named by the order table
    pub unused_patterns: Vec<u8>,
    pub samples: SampleStats,
}

/// Summarize the reachable part of `module`.
pub fn summarize(module: &Module) -> ModuleFeatures {
    let mut features = ModuleFeatures {
        busy_channels: alloc::vec![false; module.channels()],
        samples: sample_stats(module),
        ..ModuleFeatures::default()
    };

    let mut reachable = BTreeSet::new();
    for &index in module.header.used_order() {
        reachable.insert(index);
    }
    features.unused_patterns = (0..module.unpacked.len())
        .filter_map(|i| u8::try_from(i).ok())
        .filter(|i| !reachable.contains(i))
        .collect();

    for pattern in reachable.iter().filter_map(|&i| module.unpacked.get(i as usize)) {
        let channels = pattern.channels.max(1) as usize;
        for (i, event) in pattern.data.iter().enumerate() {
            if event.is_empty() {
                continue;
            }
            if let Some(busy) = features.busy_channels.get_mut(i % channels) {
                *busy = true;
            }
            features.record(event);
        }
    }

    features
}

fn sample_stats(module: &Module) -> SampleStats {
    let mut stats = SampleStats::default();
    for instrument in &module.instruments {
        stats.volume_envelopes += instrument.volume_envelope.is_active() as usize;
        stats.panning_envelopes += instrument.panning_envelope.is_active() as usize;
        for sample in &instrument.samples {
            match sample.data {
                SampleData::Pcm8(_) => stats.pcm8 += 1,
                SampleData::Pcm16(_) => stats.pcm16 += 1,
            }
            if sample.has_loop() {
                match sample.loop_type {
                    LoopType::PingPong => stats.ping_pong_loops += 1,
                    _ => stats.forward_loops += 1,
                }
            }
        }
    }
    stats
}

impl ModuleFeatures {
    fn record(&mut self, event: &Event) {
        match event.note() {
            Note::On(n) => {
                self.total_notes += 1;
                self.note_range = Some(match self.note_range {
                    Some((lo, hi)) => (lo.min(n), hi.max(n)),
                    None => (n, n),
                });
            }
            Note::Off => self.key_offs += 1,
            Note::None => {}
        }

        if event.instrument > 0 {
            self.instruments_used.insert(event.instrument);
        }

        let effect = event.effect().name();
        if effect != "None" {
            self.effects.insert(effect);
        }
        let command = event.volume_command().name();
        if command != "None" {
            self.volume_commands.insert(command);
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: impl IntoIterator<Item = impl fmt::Display>) -> fmt::Result {
    let mut first = true;
    for item in items {
        if !first {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
        first = false;
    }
    if first {
        f.write_str("(none)")?;
    }
    Ok(())
}

impl fmt::Display for ModuleFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notes:       {} ({} key-off)", self.total_notes, self.key_offs)?;
        if let Some((lo, hi)) = self.note_range {
            write!(f, ", range {lo}-{hi}")?;
        }
        writeln!(f)?;

        let busy = self.busy_channels.iter().filter(|&&b| b).count();
        writeln!(f, "Channels:    {} of {} in use", busy, self.busy_channels.len())?;
        if !self.unused_patterns.is_empty() {
            f.write_str("Unused pats: ")?;
            join(f, &self.unused_patterns)?;
            writeln!(f)?;
        }

        let s = &self.samples;
        writeln!(
            f,
            "Samples:     {} 8-bit, {} 16-bit; loops {} fwd / {} ping-pong",
            s.pcm8, s.pcm16, s.forward_loops, s.ping_pong_loops
        )?;
        writeln!(
            f,
            "Envelopes:   {} volume, {} panning; {} instruments played",
            s.volume_envelopes,
            s.panning_envelopes,
            self.instruments_used.len()
        )?;

        f.write_str("Effects:     ")?;
        join(f, &self.effects)?;
        writeln!(f)?;
        f.write_str("Vol column:  ")?;
        join(f, &self.volume_commands)?;
        writeln!(f)
    }
}
