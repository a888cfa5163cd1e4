//! # Frame Writer
//!
//! Big-endian byte writer for command bodies and frame payloads.
//!
//! ## Design
//!
//! - One growable buffer, reused across commands via [`FrameWriter::reset`]
//! - Raw field writers only: tags are emitted by [`crate::TypedValue::encode`]
//! - Strings are latin-1, one byte per character, with an `i32` length prefix

use crate::error::{WireError, WireResult};

/// Default capacity of a fresh writer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Frame writer - appends big-endian fields to an owned buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameWriter {
    buffer: Vec<u8>,
}

impl FrameWriter {
    /// Creates a new writer with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a new writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Resets the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer and returns the written bytes.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes a single unsigned byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a single signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an i32 in big-endian format.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a u32 in big-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an f64 in big-endian format.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes raw bytes without any prefix.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a length as an `i32` field.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::LengthOverflow`] if `len` exceeds `i32::MAX`.
    #[inline]
    pub fn write_count(&mut self, len: usize) -> WireResult<()> {
        let count = i32::try_from(len).map_err(|_| WireError::LengthOverflow(len))?;
        self.write_i32(count);
        Ok(())
    }

    /// Writes a latin-1 string with an `i32` length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::NonLatin1`] if any character is above U+00FF.
    pub fn write_string(&mut self, value: &str) -> WireResult<()> {
        let bytes = encode_latin1(value)?;
        self.write_count(bytes.len())?;
        self.write_bytes(&bytes);
        Ok(())
    }

    /// Writes a count-prefixed list of latin-1 strings.
    ///
    /// # Errors
    ///
    /// Fails if any element is not latin-1 encodable.
    pub fn write_string_list<S: AsRef<str>>(&mut self, values: &[S]) -> WireResult<()> {
        self.write_count(values.len())?;
        for value in values {
            self.write_string(value.as_ref())?;
        }
        Ok(())
    }

    /// Writes a count-prefixed list of doubles.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::LengthOverflow`] for lists longer than `i32::MAX`.
    pub fn write_double_list(&mut self, values: &[f64]) -> WireResult<()> {
        self.write_count(values.len())?;
        for value in values {
            self.write_f64(*value);
        }
        Ok(())
    }
}

/// Encodes a string as latin-1 bytes.
///
/// # Errors
///
/// Returns [`WireError::NonLatin1`] if any character is above U+00FF.
pub fn encode_latin1(value: &str) -> WireResult<Vec<u8>> {
    value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| WireError::NonLatin1(value.to_owned())))
        .collect()
}

/// Decodes latin-1 bytes. Every byte maps to exactly one character.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
