//! # Status Headers
//!
//! Every command in a request frame is answered by exactly one status header:
//!
//! ```text
//! [length][command id][result code][i32 len][message]
//! ```

use crate::constants::{RTYPE_ERR, RTYPE_NOTIMPLEMENTED, RTYPE_OK, SIMULATION_END_MESSAGE};
use crate::error::{WireError, WireResult};
use crate::writer::{encode_latin1, FrameWriter};

/// Result code of a status header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    /// Command succeeded.
    Ok = RTYPE_OK,
    /// Peer does not implement the command.
    NotImplemented = RTYPE_NOTIMPLEMENTED,
    /// Command failed.
    Error = RTYPE_ERR,
}

impl ResultCode {
    /// Converts a result byte.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownResultCode`] for any other byte.
    pub fn from_byte(byte: u8) -> WireResult<Self> {
        match byte {
            RTYPE_OK => Ok(Self::Ok),
            RTYPE_NOTIMPLEMENTED => Ok(Self::NotImplemented),
            RTYPE_ERR => Ok(Self::Error),
            other => Err(WireError::UnknownResultCode(other)),
        }
    }

    /// Returns the result byte.
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotImplemented => "Not implemented",
            Self::Error => "Error",
        }
    }
}

/// Decoded status header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Echoed command id.
    pub command: u8,
    /// Result code.
    pub code: ResultCode,
    /// Message, empty on success.
    pub message: String,
}

impl Status {
    /// Creates a status.
    #[must_use]
    pub fn new(command: u8, code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            command,
            code,
            message: message.into(),
        }
    }

    /// Creates an OK status with an empty message.
    #[must_use]
    pub fn ok(command: u8) -> Self {
        Self::new(command, ResultCode::Ok, String::new())
    }

    /// Returns true for [`ResultCode::Ok`].
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == ResultCode::Ok
    }

    /// Returns true if the peer reported the natural end of the simulation.
    #[must_use]
    pub fn is_simulation_end(&self) -> bool {
        self.message == SIMULATION_END_MESSAGE
    }

    /// Encodes the status header, short form when it fits one length byte.
    ///
    /// # Errors
    ///
    /// Fails if the message is not latin-1 encodable.
    pub fn encode(&self, writer: &mut FrameWriter) -> WireResult<()> {
        let message = encode_latin1(&self.message)?;
        // length byte + id + code + i32 + message
        let length = 1 + 1 + 1 + 4 + message.len();
        if let Ok(short) = u8::try_from(length) {
            writer.write_u8(short);
        } else {
            writer.write_u8(0);
            let long = u32::try_from(length + 4).map_err(|_| WireError::LengthOverflow(length))?;
            writer.write_u32(long);
        }
        writer.write_u8(self.command);
        writer.write_u8(self.code.as_byte());
        writer.write_count(message.len())?;
        writer.write_bytes(&message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CMD_SIMSTEP;

    #[test]
    fn test_result_codes() {
        assert_eq!(ResultCode::from_byte(0x00), Ok(ResultCode::Ok));
        assert_eq!(ResultCode::from_byte(0x01), Ok(ResultCode::NotImplemented));
        assert_eq!(ResultCode::from_byte(0xFF), Ok(ResultCode::Error));
        assert_eq!(
            ResultCode::from_byte(0x02),
            Err(WireError::UnknownResultCode(0x02))
        );
    }

    #[test]
    fn test_ok_status_layout() {
        let mut writer = FrameWriter::new();
        Status::ok(CMD_SIMSTEP).encode(&mut writer).unwrap();

        assert_eq!(writer.as_slice(), &[7, CMD_SIMSTEP, 0x00, 0, 0, 0, 0]);
    }

    #[test]
    fn test_simulation_end_detection() {
        let status = Status::new(CMD_SIMSTEP, ResultCode::Error, SIMULATION_END_MESSAGE);
        assert!(status.is_simulation_end());
        assert!(!status.is_ok());
    }
}
