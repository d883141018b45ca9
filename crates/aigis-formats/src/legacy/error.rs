//! Legacy transport codec error types

use thiserror::Error;

/// Errors from the XOR cipher and the legacy LZ decompressor
#[derive(Debug, Error)]
pub enum LegacyError {
    /// No known plaintext prefix matched within the scanned window
    #[error("no cipher key found in the first {0} bytes")]
    KeyNotFound(usize),

    /// Input ended inside the size prefix or a token
    #[error("truncated input at 0x{position:X}: need {needed} more bytes")]
    Truncated {
        /// Input position of the read
        position: usize,
        /// Bytes requested
        needed: usize,
    },

    /// Terminal group of the size prefix wider than 4 bits
    #[error("invalid size prefix terminal group: 0x{0:02X}")]
    InvalidSizePrefix(u8),

    /// Match offset of zero or reaching before the output start
    #[error("match offset {offset} outside the {available} bytes decoded so far")]
    InvalidOffset {
        /// Offset decoded from the token
        offset: usize,
        /// Output length when the match was applied
        available: usize,
    },

    /// Output length differs from the size prefix
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Size from the prefix
        expected: usize,
        /// Size produced
        actual: usize,
    },

    /// Decoded document is not UTF-8
    #[error("decoded document is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LegacyError {
    /// Category of this error in the engine taxonomy
    pub fn kind(&self) -> crate::ErrorKind {
        match self {
            Self::KeyNotFound(_) | Self::Utf8(_) => crate::ErrorKind::Format,
            Self::Truncated { .. } => crate::ErrorKind::Truncation,
            Self::InvalidSizePrefix(_) | Self::InvalidOffset { .. } | Self::LengthMismatch { .. } => {
                crate::ErrorKind::Corruption
            }
        }
    }
}

/// Result type for legacy codec operations
pub type LegacyResult<T> = Result<T, LegacyError>;
