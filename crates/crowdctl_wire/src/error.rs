//! # Wire Error Types
//!
//! All errors that can occur while encoding or decoding protocol bytes.

use thiserror::Error;

/// Errors that can occur in the wire codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before a complete field could be read.
    #[error("truncated frame: needed {needed} bytes, {available} available")]
    TruncatedFrame {
        /// Bytes required by the field.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A typed value carried a different tag than the caller expected.
    #[error("unexpected type tag: expected 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedType {
        /// Tag the caller asked for.
        expected: u8,
        /// Tag found on the wire.
        found: u8,
    },

    /// A tag byte that no known value type uses.
    #[error("unknown type tag 0x{0:02x}")]
    UnknownTag(u8),

    /// A status header carried an unknown result code.
    #[error("unknown result code 0x{0:02x}")]
    UnknownResultCode(u8),

    /// A string contained a character outside latin-1.
    #[error("string is not latin-1 encodable: {0:?}")]
    NonLatin1(String),

    /// A length does not fit the field that must carry it.
    #[error("length {0} does not fit its length field")]
    LengthOverflow(usize),
}

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;
