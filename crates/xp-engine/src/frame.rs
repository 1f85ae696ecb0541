//! Audio frame type.

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: i16) -> Self {
        Self { left: value, right: value }
    }

    /// Hard-clamp a pair of 32-bit accumulators into a frame.
    #[inline]
    pub fn from_accumulator(left: i32, right: i32) -> Self {
        Self {
            left: left.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            right: right.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        }
    }

    /// Mix another frame into this one.
    pub fn mix(&mut self, other: Frame) {
        *self = Self::from_accumulator(
            self.left as i32 + other.left as i32,
            self.right as i32 + other.right as i32,
        );
    }

    /// Interleaved little-endian bytes (left, right).
    pub fn to_le_bytes(self) -> [u8; 4] {
        let l = self.left.to_le_bytes();
        let r = self.right.to_le_bytes();
        [l[0], l[1], r[0], r[1]]
    }
}
