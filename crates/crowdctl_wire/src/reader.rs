//! # Frame Reader
//!
//! Cursor over a received frame payload.
//!
//! Every read checks the remaining length first and fails with
//! [`WireError::TruncatedFrame`] instead of returning partial data.

use crate::error::{WireError, WireResult};
use crate::status::{ResultCode, Status};
use crate::value::{TypeTag, TypedValue};
use crate::writer::decode_latin1;

/// Frame reader - reads big-endian fields from a borrowed buffer.
#[derive(Debug, Clone)]
pub struct FrameReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    /// Creates a new reader from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the current read offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns true once every byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] if fewer bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> WireResult<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(WireError::TruncatedFrame {
                needed: len,
                available,
            });
        }
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Skips `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] if fewer bytes remain.
    pub fn skip(&mut self, len: usize) -> WireResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    fn read_array<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a single unsigned byte.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] at the end of the buffer.
    #[inline]
    pub fn read_u8(&mut self) -> WireResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a single signed byte.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] at the end of the buffer.
    #[inline]
    pub fn read_i8(&mut self) -> WireResult<i8> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Reads an i32 in big-endian format.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_i32(&mut self) -> WireResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads a u32 in big-endian format.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_u32(&mut self) -> WireResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads an f64 in big-endian format.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] if fewer than 8 bytes remain.
    #[inline]
    pub fn read_f64(&mut self) -> WireResult<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Reads an `i32` count. Negative counts are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::LengthOverflow`] for negative counts.
    pub fn read_count(&mut self) -> WireResult<usize> {
        let raw = self.read_i32()?;
        usize::try_from(raw).map_err(|_| WireError::LengthOverflow(raw as u32 as usize))
    }

    /// Reads an `i32` length-prefixed latin-1 string.
    ///
    /// # Errors
    ///
    /// Fails if the declared length exceeds the remaining bytes.
    pub fn read_string(&mut self) -> WireResult<String> {
        let len = self.read_count()?;
        Ok(decode_latin1(self.read_bytes(len)?))
    }

    /// Reads a count-prefixed list of strings.
    ///
    /// # Errors
    ///
    /// Fails if any element is truncated.
    pub fn read_string_list(&mut self) -> WireResult<Vec<String>> {
        let count = self.read_count()?;
        let mut out = Vec::with_capacity(count.min(self.remaining() / 4));
        for _ in 0..count {
            out.push(self.read_string()?);
        }
        Ok(out)
    }

    /// Reads a count-prefixed list of doubles.
    ///
    /// # Errors
    ///
    /// Fails if any element is truncated.
    pub fn read_double_list(&mut self) -> WireResult<Vec<f64>> {
        let count = self.read_count()?;
        let mut out = Vec::with_capacity(count.min(self.remaining() / 8));
        for _ in 0..count {
            out.push(self.read_f64()?);
        }
        Ok(out)
    }

    /// Reads a command or status length field.
    ///
    /// A non-zero byte is the length itself; a zero byte is followed by the
    /// long form `i32` length.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedFrame`] on short input.
    pub fn read_length(&mut self) -> WireResult<usize> {
        match self.read_u8()? {
            0 => self.read_count(),
            short => Ok(usize::from(short)),
        }
    }

    /// Reads one status header.
    ///
    /// # Errors
    ///
    /// Fails on short input or an unknown result code.
    pub fn read_status(&mut self) -> WireResult<Status> {
        let _length = self.read_length()?;
        let command = self.read_u8()?;
        let code = ResultCode::from_byte(self.read_u8()?)?;
        let message = self.read_string()?;
        Ok(Status {
            command,
            code,
            message,
        })
    }

    /// Reads a typed value whose tag must equal `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedType`] on a tag mismatch.
    pub fn read_typed(&mut self, expected: TypeTag) -> WireResult<TypedValue> {
        let found = self.read_u8()?;
        if found != expected.as_byte() {
            return Err(WireError::UnexpectedType {
                expected: expected.as_byte(),
                found,
            });
        }
        self.read_payload(expected)
    }

    /// Reads a typed value of any tag.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownTag`] for unassigned tag bytes.
    pub fn read_value(&mut self) -> WireResult<TypedValue> {
        let tag = TypeTag::from_byte(self.read_u8()?)?;
        self.read_payload(tag)
    }

    /// Reads a tagged double.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedType`] on a tag mismatch.
    pub fn read_typed_f64(&mut self) -> WireResult<f64> {
        self.expect_tag(TypeTag::Double)?;
        self.read_f64()
    }

    /// Reads a tagged integer.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedType`] on a tag mismatch.
    pub fn read_typed_i32(&mut self) -> WireResult<i32> {
        self.expect_tag(TypeTag::Integer)?;
        self.read_i32()
    }

    /// Reads a tagged string.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedType`] on a tag mismatch.
    pub fn read_typed_string(&mut self) -> WireResult<String> {
        self.expect_tag(TypeTag::String)?;
        self.read_string()
    }

    /// Reads a tagged string list.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedType`] on a tag mismatch.
    pub fn read_typed_string_list(&mut self) -> WireResult<Vec<String>> {
        self.expect_tag(TypeTag::StringList)?;
        self.read_string_list()
    }

    fn expect_tag(&mut self, expected: TypeTag) -> WireResult<()> {
        let found = self.read_u8()?;
        if found == expected.as_byte() {
            Ok(())
        } else {
            Err(WireError::UnexpectedType {
                expected: expected.as_byte(),
                found,
            })
        }
    }

    fn read_payload(&mut self, tag: TypeTag) -> WireResult<TypedValue> {
        Ok(match tag {
            TypeTag::Integer => TypedValue::Integer(self.read_i32()?),
            TypeTag::Double => TypedValue::Double(self.read_f64()?),
            TypeTag::Byte => TypedValue::Byte(self.read_i8()?),
            TypeTag::UByte => TypedValue::UByte(self.read_u8()?),
            TypeTag::String => TypedValue::String(self.read_string()?),
            TypeTag::StringList => TypedValue::StringList(self.read_string_list()?),
            TypeTag::DoubleList => TypedValue::DoubleList(self.read_double_list()?),
            TypeTag::Position2D => TypedValue::Position2D {
                x: self.read_f64()?,
                y: self.read_f64()?,
            },
            TypeTag::Position3D => TypedValue::Position3D {
                x: self.read_f64()?,
                y: self.read_f64()?,
                z: self.read_f64()?,
            },
            TypeTag::LonLat => TypedValue::LonLat {
                lon: self.read_f64()?,
                lat: self.read_f64()?,
            },
            TypeTag::LonLatAlt => TypedValue::LonLatAlt {
                lon: self.read_f64()?,
                lat: self.read_f64()?,
                alt: self.read_f64()?,
            },
            TypeTag::RoadMap => TypedValue::RoadMap {
                road_id: self.read_string()?,
                pos: self.read_f64()?,
                lane: self.read_u8()?,
            },
            TypeTag::Polygon => {
                let count = usize::from(self.read_u8()?);
                let mut points = Vec::with_capacity(count);
                for _ in 0..count {
                    points.push((self.read_f64()?, self.read_f64()?));
                }
                TypedValue::Polygon(points)
            }
            TypeTag::Color => {
                let [r, g, b, a] = self.read_array::<4>()?;
                TypedValue::Color { r, g, b, a }
            }
            TypeTag::Compound => {
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.read_value()?);
                }
                TypedValue::Compound(items)
            }
        })
    }
}
