//! Delta-coded PCM.
//!
//! Sample data is stored as differences between consecutive values,
//! starting from an implicit zero. Decoding is a wrapping cumulative sum.

/// Decode 8-bit delta data.
pub fn decode_delta8(raw: &[u8]) -> Vec<i8> {
    let mut acc = 0i8;
    raw.iter()
        .map(|&d| {
            acc = acc.wrapping_add(d as i8);
            acc
        })
        .collect()
}

/// Decode 16-bit little-endian delta data. A trailing odd byte is dropped.
pub fn decode_delta16(raw: &[u8]) -> Vec<i16> {
    let mut acc = 0i16;
    raw.chunks_exact(2)
        .map(|pair| {
            acc = acc.wrapping_add(i16::from_le_bytes([pair[0], pair[1]]));
            acc
        })
        .collect()
}

/// Encode 8-bit PCM as delta bytes.
pub fn encode_delta8(pcm: &[i8]) -> Vec<u8> {
    let mut prev = 0i8;
    pcm.iter()
        .map(|&s| {
            let d = s.wrapping_sub(prev);
            prev = s;
            d as u8
        })
        .collect()
}

/// Encode 16-bit PCM as little-endian delta bytes.
pub fn encode_delta16(pcm: &[i16]) -> Vec<u8> {
    let mut prev = 0i16;
    let mut out = Vec::with_capacity(pcm.len() * 2);
    for &s in pcm {
        out.extend_from_slice(&s.wrapping_sub(prev).to_le_bytes());
        prev = s;
    }
    out
}
