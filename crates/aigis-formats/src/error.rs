//! Error types for the AL* format engine
//!
//! Every variant belongs to exactly one failure category (see [`ErrorKind`]).
//! None of them are recoverable mid-parse: later offsets depend on earlier
//! structure being understood correctly.

use thiserror::Error;

/// Failure category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown tag, unsupported version/form, unknown field type
    Format,
    /// Read past the end of the buffer or window
    Truncation,
    /// Decoded data contradicts its own header
    Corruption,
    /// Cursor not at the offset the layout requires
    Alignment,
    /// A translation step failed
    Patch,
}

/// Format engine error type
#[derive(Debug, Error)]
pub enum Error {
    /// Magic tag not in the dispatch table
    #[error("unknown object tag {} ({}) at 0x{position:X}", String::from_utf8_lossy(.tag), hex::encode(.tag))]
    UnknownMagic {
        /// The four bytes found
        tag: [u8; 4],
        /// Absolute position of the tag
        position: usize,
    },

    /// Version byte not supported for this format
    #[error("unsupported {format} version: {version}")]
    UnsupportedVersion {
        /// Format name
        format: &'static str,
        /// Version found
        version: u8,
    },

    /// Form bit combination not supported for this format
    #[error("unsupported {format} form: 0x{form:02X}")]
    UnsupportedForm {
        /// Format name
        format: &'static str,
        /// Form found
        form: u8,
    },

    /// Table field type code outside the known set
    #[error("unknown field type code: {0}")]
    UnknownFieldType(u8),

    /// Header value disagrees with the value implied by the rest of the header
    #[error("{format} header field {field} is 0x{actual:X}, expected 0x{expected:X}")]
    HeaderMismatch {
        /// Format name
        format: &'static str,
        /// Field name
        field: &'static str,
        /// Expected value
        expected: u64,
        /// Value found
        actual: u64,
    },

    /// A field or string does not fit the structure that owns it
    #[error("invalid {format} layout: {reason}")]
    InvalidLayout {
        /// Format name
        format: &'static str,
        /// What is wrong
        reason: String,
    },

    /// Read past the end of the readable range
    #[error("truncated read at 0x{position:X}: need {needed} bytes, {available} available")]
    Truncated {
        /// Absolute position of the read
        position: usize,
        /// Bytes requested
        needed: usize,
        /// Bytes left before the end bound
        available: usize,
    },

    /// Decompressed output does not have the declared size
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Size declared by the header
        expected: usize,
        /// Size produced
        actual: usize,
    },

    /// Nonzero bits left in the bit buffer after decoding finished
    #[error("leftover bits after decoding: 0b{0:b}")]
    LeftoverBits(u64),

    /// Compressed stream ended before any completion case was reached
    #[error("compressed stream overflowed before completion")]
    Overflow,

    /// Any other inconsistency inside compressed data
    #[error("corrupt compressed data: {0}")]
    Corrupt(String),

    /// Cursor position differs from the offset the header declares
    #[error("misaligned {section}: cursor at 0x{actual:X}, expected 0x{expected:X}")]
    Misaligned {
        /// Section being located
        section: &'static str,
        /// Offset from the header
        expected: usize,
        /// Actual cursor offset
        actual: usize,
    },

    /// Patching a child object failed
    #[error("failed to patch {path}: {source}")]
    Patch {
        /// Translation scope path of the child
        path: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Serializing a parsed object did not reproduce its input
    #[error("round trip differs at byte {offset}: {expected} bytes in, {actual} bytes out")]
    RoundTripMismatch {
        /// First differing byte
        offset: usize,
        /// Input length
        expected: usize,
        /// Output length
        actual: usize,
    },

    /// Translation data could not be applied
    #[error("translation error: {0}")]
    Translation(String),

    /// Binary header decoding error not covered above
    #[error("binary parsing error: {0}")]
    BinRw(binrw::Error),
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMagic { .. }
            | Self::UnsupportedVersion { .. }
            | Self::UnsupportedForm { .. }
            | Self::UnknownFieldType(_)
            | Self::HeaderMismatch { .. }
            | Self::InvalidLayout { .. }
            | Self::BinRw(_) => ErrorKind::Format,
            Self::Truncated { .. } => ErrorKind::Truncation,
            Self::LengthMismatch { .. }
            | Self::LeftoverBits(_)
            | Self::Overflow
            | Self::Corrupt(_)
            | Self::RoundTripMismatch { .. } => ErrorKind::Corruption,
            Self::Misaligned { .. } => ErrorKind::Alignment,
            Self::Patch { .. } | Self::Translation(_) => ErrorKind::Patch,
        }
    }

    pub(crate) fn layout(format: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidLayout {
            format,
            reason: reason.into(),
        }
    }

    /// Map a binrw failure at `position` into the crate taxonomy
    pub(crate) fn from_binrw(err: binrw::Error, position: usize, available: usize) -> Self {
        match err {
            // Field reads come back wrapped in a backtrace
            ref eof if eof.is_eof() => Self::Truncated {
                position,
                needed: available + 1,
                available,
            },
            binrw::Error::BadMagic { .. } => {
                Self::layout("header", format!("bad magic at 0x{position:X}"))
            }
            other => Self::BinRw(other),
        }
    }
}

/// Result type for format engine operations
pub type Result<T> = std::result::Result<T, Error>;
