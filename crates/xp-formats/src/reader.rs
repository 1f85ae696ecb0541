//! Cursor over a byte slice. Every short read is `UnexpectedEof`.

use crate::FormatError;

pub(crate) struct ModuleReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ModuleReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), FormatError> {
        self.read_bytes(n).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, FormatError> {
        let v = *self.data.get(self.pos).ok_or(FormatError::UnexpectedEof)?;
        self.pos += 1;
        Ok(v)
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, FormatError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self.pos.checked_add(n).ok_or(FormatError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(FormatError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    /// Read `n` bytes into a buffer of at least `min` bytes, zero-padding
    /// the tail. Lets short, older headers decode with a fixed layout.
    pub(crate) fn read_padded(&mut self, n: usize, min: usize) -> Result<Vec<u8>, FormatError> {
        let mut buf = self.read_bytes(n)?.to_vec();
        if buf.len() < min {
            buf.resize(min, 0);
        }
        Ok(buf)
    }
}
