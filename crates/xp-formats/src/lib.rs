//! Format parsers for the xmplay tracker engine.
//!
//! Parses FastTracker 2 Extended Module (XM) files into the IR, and
//! writes a [`Module`](xp_ir::Module) back out in the same layout.

mod delta;
mod layout;
mod reader;
mod unpack;
mod xm_format;
mod xm_writer;

pub use delta::{decode_delta16, decode_delta8, encode_delta16, encode_delta8};
pub use unpack::unpack_pattern;
pub use xm_format::{load_module, load_module_file, SIGNATURE};
pub use xm_writer::{pack_pattern, write_module};

/// Error type for format parsing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The data ended before a structure was complete
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// The file does not start with the module signature
    #[error("invalid module signature")]
    InvalidSignature,
    /// The byte after the module name is not 0x1A
    #[error("invalid header terminator 0x{0:02X}")]
    InvalidTerminator(u8),
    /// The extensible header declares an impossible size
    #[error("invalid header size {0}")]
    InvalidHeaderSize(u32),
    /// Song length is zero or larger than the order table
    #[error("invalid song length {0}")]
    InvalidSongLength(u16),
    /// The header channel count is zero
    #[error("module declares no channels")]
    NoChannels,
    /// More channels than the mixer supports
    #[error("too many channels: {0} (max {max})", max = xp_ir::MAX_CHANNELS)]
    TooManyChannels(u16),
    /// More patterns than the format allows
    #[error("too many patterns: {0} (max {max})", max = xp_ir::MAX_PATTERNS)]
    TooManyPatterns(u16),
    /// More instruments than the format allows
    #[error("too many instruments: {0} (max {max})", max = xp_ir::MAX_INSTRUMENTS)]
    TooManyInstruments(u16),
    /// A pattern declares zero rows or more than 256
    #[error("pattern {pattern} has invalid row count {rows}")]
    InvalidRowCount { pattern: u16, rows: u16 },
    /// An instrument header size lies outside [29, 1024]
    #[error("instrument {instrument} has invalid header size {size}")]
    InvalidInstrumentHeaderSize { instrument: u16, size: u32 },
    /// A fixed layout could not be decoded
    #[error("malformed structure: {0}")]
    Layout(#[from] binrw::Error),
}
