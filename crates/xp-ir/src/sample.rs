//! Sample data types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// A sample definition. Exclusively owned by its instrument.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<22>,
    /// Decoded audio data
    pub data: SampleData,
    /// Loop start position (in frames)
    pub loop_start: u32,
    /// Loop length (in frames)
    pub loop_length: u32,
    /// Loop type
    pub loop_type: LoopType,
    /// Default volume (0-64)
    pub volume: u8,
    /// Finetune in 1/128 semitone steps (-128 to +127)
    pub finetune: i8,
    /// Default panning (0-255, 128 = center)
    pub panning: u8,
    /// Semitone offset applied to the played note
    pub relative_note: i8,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            data: SampleData::Pcm8(Vec::new()),
            loop_start: 0,
            loop_length: 0,
            loop_type: LoopType::None,
            volume: 64,
            finetune: 0,
            panning: 128,
            relative_note: 0,
        }
    }
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.name.try_push_str(name);
        sample
    }

    /// Get the length of the sample in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sample has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the sample loops. Loops shorter than two frames
    /// are treated as one-shot.
    pub fn has_loop(&self) -> bool {
        self.loop_type != LoopType::None && self.loop_length > 1
    }

    /// Exclusive end of the loop, clamped to the data length.
    pub fn loop_end(&self) -> u32 {
        let end = self.loop_start.saturating_add(self.loop_length);
        end.min(self.len() as u32)
    }
}

/// Sample loop type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopType {
    /// No loop
    #[default]
    None,
    /// Forward loop
    Forward,
    /// Ping-pong (bidirectional) loop
    PingPong,
}

impl LoopType {
    /// Decode the low two bits of a sample type byte.
    pub const fn from_type_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => LoopType::Forward,
            2 => LoopType::PingPong,
            _ => LoopType::None,
        }
    }
}

/// Decoded signed PCM.
#[derive(Clone, Debug)]
pub enum SampleData {
    /// 8-bit samples
    Pcm8(Vec<i8>),
    /// 16-bit samples
    Pcm16(Vec<i16>),
}

impl SampleData {
    /// Get the number of sample frames.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Pcm8(v) => v.len(),
            SampleData::Pcm16(v) => v.len(),
        }
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bits per sample.
    pub fn bits(&self) -> u8 {
        match self {
            SampleData::Pcm8(_) => 8,
            SampleData::Pcm16(_) => 16,
        }
    }

    /// Sample value at `pos` scaled to 16 bits. Out of range reads are silent.
    #[inline]
    pub fn get(&self, pos: usize) -> i16 {
        match self {
            SampleData::Pcm8(v) => v.get(pos).copied().unwrap_or(0) as i16 * 256,
            SampleData::Pcm16(v) => v.get(pos).copied().unwrap_or(0),
        }
    }

    /// Linearly interpolated value between frames `idx` and `next`.
    ///
    /// `frac` is the 16-bit fractional part of a 16.16 position. The
    /// caller picks `next` so loops interpolate across the wrap point.
    #[inline]
    pub fn interpolated(&self, idx: usize, next: usize, frac: u32) -> i16 {
        let a = self.get(idx) as i32;
        let b = self.get(next) as i32;
        (a + (((b - a) * (frac & 0xFFFF) as i32) >> 16)) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn eight_bit_scales_to_sixteen() {
        let data = SampleData::Pcm8(vec![127, -128, 1]);
        assert_eq!(data.get(0), 32512);
        assert_eq!(data.get(1), -32768);
        assert_eq!(data.get(2), 256);
        assert_eq!(data.get(3), 0);
    }

    #[test]
    fn interpolates_halfway() {
        let data = SampleData::Pcm16(vec![0, 1000]);
        assert_eq!(data.interpolated(0, 1, 0x8000), 500);
        assert_eq!(data.interpolated(0, 1, 0), 0);
    }

    #[test]
    fn short_loops_are_one_shot() {
        let mut sample = Sample::new("s");
        sample.data = SampleData::Pcm8(vec![0; 16]);
        sample.loop_type = LoopType::Forward;
        sample.loop_length = 1;
        assert!(!sample.has_loop());
        sample.loop_length = 2;
        assert!(sample.has_loop());
    }

    #[test]
    fn loop_end_clamps_to_data() {
        let mut sample = Sample::new("s");
        sample.data = SampleData::Pcm8(vec![0; 10]);
        sample.loop_type = LoopType::Forward;
        sample.loop_start = 4;
        sample.loop_length = 100;
        assert_eq!(sample.loop_end(), 10);
    }

    #[test]
    fn loop_type_bits() {
        assert_eq!(LoopType::from_type_bits(0x10), LoopType::None);
        assert_eq!(LoopType::from_type_bits(0x11), LoopType::Forward);
        assert_eq!(LoopType::from_type_bits(0x12), LoopType::PingPong);
        assert_eq!(LoopType::from_type_bits(0x03), LoopType::None);
    }
}
