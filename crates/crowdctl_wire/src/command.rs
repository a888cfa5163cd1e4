//! # Command Framing
//!
//! A command is a command id, an optional address and a payload:
//!
//! ```text
//! short:  [u8 len][u8 id][address][payload]            len <= 255
//! long:   [u8 0][u32 len + 4][u8 id][address][payload]
//!
//! variable address:      [u8 var][i32 len][object id]
//! subscription address:  [f64 begin][f64 end][i32 len][object id]
//! ```
//!
//! `len` counts the length byte itself plus everything after it.
//!
//! A [`Frame`] wraps one or more encoded commands:
//!
//! ```text
//! [u32 total][payload]      total = len(payload) + 4
//! ```

use crate::error::{WireError, WireResult};
use crate::value::TypedValue;
use crate::writer::FrameWriter;

/// Largest length that still fits the short command header.
pub const MAX_SHORT_LENGTH: usize = 255;

/// Addressing part of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// No address (generic commands such as simulation step).
    None,
    /// Variable of one object.
    Variable {
        /// Variable id.
        variable: u8,
        /// Object id.
        object: String,
    },
    /// Subscription window on one object.
    Subscription {
        /// Begin of the subscription window.
        begin: f64,
        /// End of the subscription window.
        end: f64,
        /// Object id.
        object: String,
    },
}

/// One addressed command with its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: u8,
    target: Target,
    payload: FrameWriter,
}

impl Command {
    /// Creates a command without an address.
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            target: Target::None,
            payload: FrameWriter::with_capacity(16),
        }
    }

    /// Creates a command addressing one variable of an object.
    #[must_use]
    pub fn variable(id: u8, variable: u8, object: impl Into<String>) -> Self {
        Self {
            target: Target::Variable {
                variable,
                object: object.into(),
            },
            ..Self::new(id)
        }
    }

    /// Creates a subscription command for an object.
    #[must_use]
    pub fn subscription(id: u8, begin: f64, end: f64, object: impl Into<String>) -> Self {
        Self {
            target: Target::Subscription {
                begin,
                end,
                object: object.into(),
            },
            ..Self::new(id)
        }
    }

    /// Returns the command id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Returns the address.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Returns the payload writer for raw fields.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut FrameWriter {
        &mut self.payload
    }

    /// Appends a typed value to the payload.
    ///
    /// # Errors
    ///
    /// See [`TypedValue::encode`].
    pub fn with_value(mut self, value: &TypedValue) -> WireResult<Self> {
        value.encode(&mut self.payload)?;
        Ok(self)
    }

    /// Appends a raw unsigned byte to the payload.
    #[must_use]
    pub fn with_u8(mut self, value: u8) -> Self {
        self.payload.write_u8(value);
        self
    }

    /// Appends a raw i32 to the payload.
    #[must_use]
    pub fn with_i32(mut self, value: i32) -> Self {
        self.payload.write_i32(value);
        self
    }

    /// Appends a raw f64 to the payload.
    #[must_use]
    pub fn with_f64(mut self, value: f64) -> Self {
        self.payload.write_f64(value);
        self
    }

    /// Encodes the command into `writer`.
    ///
    /// # Errors
    ///
    /// Fails if the object id is not latin-1 or the command is larger than
    /// a `u32` length can describe.
    pub fn encode_into(&self, writer: &mut FrameWriter) -> WireResult<()> {
        let mut body = FrameWriter::with_capacity(self.payload.len() + 32);
        body.write_u8(self.id);
        match &self.target {
            Target::None => {}
            Target::Variable { variable, object } => {
                body.write_u8(*variable);
                body.write_string(object)?;
            }
            Target::Subscription { begin, end, object } => {
                body.write_f64(*begin);
                body.write_f64(*end);
                body.write_string(object)?;
            }
        }
        body.write_bytes(self.payload.as_slice());

        write_length_header(writer, body.len())?;
        writer.write_bytes(body.as_slice());
        Ok(())
    }

    /// Encodes the command into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`Command::encode_into`].
    pub fn encode(&self) -> WireResult<Vec<u8>> {
        let mut writer = FrameWriter::with_capacity(self.payload.len() + 40);
        self.encode_into(&mut writer)?;
        Ok(writer.into_bytes())
    }
}

/// Writes the short or long command length header for a body of
/// `body_len` bytes (command id included).
///
/// # Errors
///
/// Returns [`WireError::LengthOverflow`] if the long form overflows `u32`.
pub fn write_length_header(writer: &mut FrameWriter, body_len: usize) -> WireResult<()> {
    let short = body_len + 1;
    if short <= MAX_SHORT_LENGTH {
        writer.write_u8(short as u8);
    } else {
        let long = u32::try_from(short + 4).map_err(|_| WireError::LengthOverflow(short))?;
        writer.write_u8(0);
        writer.write_u32(long);
    }
    Ok(())
}

/// Outer frame of a request or response.
pub struct Frame;

impl Frame {
    /// Size of the frame length prefix.
    pub const HEADER_LEN: usize = 4;

    /// Prefixes `payload` with the total frame length.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::LengthOverflow`] for payloads that overflow `u32`.
    pub fn encode(payload: &[u8]) -> WireResult<Vec<u8>> {
        let total = payload.len() + Self::HEADER_LEN;
        let header = u32::try_from(total).map_err(|_| WireError::LengthOverflow(total))?;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&header.to_be_bytes());
        out.extend_from_slice(payload);
        Ok(out)
    }

    /// Returns the payload length announced by a frame header.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] if the header claims fewer than
    /// its own four bytes.
    pub fn payload_len(header: [u8; 4]) -> WireResult<usize> {
        let total = u32::from_be_bytes(header) as usize;
        total
            .checked_sub(Self::HEADER_LEN)
            .ok_or(WireError::TruncatedFrame {
                needed: Self::HEADER_LEN,
                available: total,
            })
    }
}
