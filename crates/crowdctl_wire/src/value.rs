//! # Typed Values
//!
//! The tagged union carried by get/set commands and subscription results.
//!
//! ## Layouts
//!
//! ```text
//! Integer      [0x09][i32]
//! Double       [0x0B][f64]
//! Byte         [0x08][i8]
//! UByte        [0x07][u8]
//! String       [0x0C][i32 len][latin-1 bytes]
//! StringList   [0x0E][i32 count]([i32 len][bytes])*
//! DoubleList   [0x0D][i32 count][f64]*
//! Position2D   [0x01][f64 x][f64 y]
//! Position3D   [0x03][f64 x][f64 y][f64 z]
//! LonLat       [0x00][f64 lon][f64 lat]
//! LonLatAlt    [0x02][f64 lon][f64 lat][f64 alt]
//! RoadMap      [0x04][i32 len][road id][f64 pos][u8 lane]
//! Polygon      [0x06][u8 count]([f64 x][f64 y])*
//! Color        [0x11][u8 r][u8 g][u8 b][u8 a]
//! Compound     [0x0F][i32 count] followed by `count` typed values
//! ```

use crate::constants::{
    POSITION_2D, POSITION_3D, POSITION_LON_LAT, POSITION_LON_LAT_ALT, POSITION_ROADMAP,
    TYPE_BYTE, TYPE_COLOR, TYPE_COMPOUND, TYPE_DOUBLE, TYPE_DOUBLELIST, TYPE_INTEGER,
    TYPE_POLYGON, TYPE_STRING, TYPE_STRINGLIST, TYPE_UBYTE,
};
use crate::error::{WireError, WireResult};
use crate::writer::FrameWriter;

/// Type tag of a value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    /// Geographic position.
    LonLat = POSITION_LON_LAT,
    /// Cartesian 2D position.
    Position2D = POSITION_2D,
    /// Geographic position with altitude.
    LonLatAlt = POSITION_LON_LAT_ALT,
    /// Cartesian 3D position.
    Position3D = POSITION_3D,
    /// Road-map position.
    RoadMap = POSITION_ROADMAP,
    /// Polygon.
    Polygon = TYPE_POLYGON,
    /// Unsigned byte.
    UByte = TYPE_UBYTE,
    /// Signed byte.
    Byte = TYPE_BYTE,
    /// 32-bit integer.
    Integer = TYPE_INTEGER,
    /// 64-bit float.
    Double = TYPE_DOUBLE,
    /// Latin-1 string.
    String = TYPE_STRING,
    /// List of doubles.
    DoubleList = TYPE_DOUBLELIST,
    /// List of strings.
    StringList = TYPE_STRINGLIST,
    /// Compound header.
    Compound = TYPE_COMPOUND,
    /// RGBA color.
    Color = TYPE_COLOR,
}

impl TypeTag {
    /// Converts a tag byte.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownTag`] for bytes no value type uses.
    pub fn from_byte(byte: u8) -> WireResult<Self> {
        Ok(match byte {
            POSITION_LON_LAT => Self::LonLat,
            POSITION_2D => Self::Position2D,
            POSITION_LON_LAT_ALT => Self::LonLatAlt,
            POSITION_3D => Self::Position3D,
            POSITION_ROADMAP => Self::RoadMap,
            TYPE_POLYGON => Self::Polygon,
            TYPE_UBYTE => Self::UByte,
            TYPE_BYTE => Self::Byte,
            TYPE_INTEGER => Self::Integer,
            TYPE_DOUBLE => Self::Double,
            TYPE_STRING => Self::String,
            TYPE_DOUBLELIST => Self::DoubleList,
            TYPE_STRINGLIST => Self::StringList,
            TYPE_COMPOUND => Self::Compound,
            TYPE_COLOR => Self::Color,
            other => return Err(WireError::UnknownTag(other)),
        })
    }

    /// Returns the tag byte.
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A typed value as carried on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// 32-bit integer.
    Integer(i32),
    /// 64-bit float.
    Double(f64),
    /// Signed byte.
    Byte(i8),
    /// Unsigned byte.
    UByte(u8),
    /// Latin-1 string.
    String(String),
    /// List of strings.
    StringList(Vec<String>),
    /// List of doubles.
    DoubleList(Vec<f64>),
    /// Cartesian 2D position.
    Position2D {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
    /// Cartesian 3D position.
    Position3D {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
        /// Z coordinate.
        z: f64,
    },
    /// Geographic position.
    LonLat {
        /// Longitude.
        lon: f64,
        /// Latitude.
        lat: f64,
    },
    /// Geographic position with altitude.
    LonLatAlt {
        /// Longitude.
        lon: f64,
        /// Latitude.
        lat: f64,
        /// Altitude.
        alt: f64,
    },
    /// Road-map position.
    RoadMap {
        /// Road id.
        road_id: String,
        /// Offset along the road.
        pos: f64,
        /// Lane index.
        lane: u8,
    },
    /// Closed shape of 2D points.
    Polygon(Vec<(f64, f64)>),
    /// RGBA color.
    Color {
        /// Red.
        r: u8,
        /// Green.
        g: u8,
        /// Blue.
        b: u8,
        /// Alpha.
        a: u8,
    },
    /// Sequence of typed values behind a compound header.
    Compound(Vec<TypedValue>),
}

impl TypedValue {
    /// Returns the tag this value is encoded with.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::Integer(_) => TypeTag::Integer,
            Self::Double(_) => TypeTag::Double,
            Self::Byte(_) => TypeTag::Byte,
            Self::UByte(_) => TypeTag::UByte,
            Self::String(_) => TypeTag::String,
            Self::StringList(_) => TypeTag::StringList,
            Self::DoubleList(_) => TypeTag::DoubleList,
            Self::Position2D { .. } => TypeTag::Position2D,
            Self::Position3D { .. } => TypeTag::Position3D,
            Self::LonLat { .. } => TypeTag::LonLat,
            Self::LonLatAlt { .. } => TypeTag::LonLatAlt,
            Self::RoadMap { .. } => TypeTag::RoadMap,
            Self::Polygon(_) => TypeTag::Polygon,
            Self::Color { .. } => TypeTag::Color,
            Self::Compound(_) => TypeTag::Compound,
        }
    }

    /// Encodes the tag byte followed by the value layout.
    ///
    /// # Errors
    ///
    /// Fails on non latin-1 strings, on polygons with more than 255 points,
    /// and on lists whose length does not fit an `i32`.
    pub fn encode(&self, writer: &mut FrameWriter) -> WireResult<()> {
        writer.write_u8(self.tag().as_byte());
        match self {
            Self::Integer(v) => writer.write_i32(*v),
            Self::Double(v) => writer.write_f64(*v),
            Self::Byte(v) => writer.write_i8(*v),
            Self::UByte(v) => writer.write_u8(*v),
            Self::String(v) => writer.write_string(v)?,
            Self::StringList(v) => writer.write_string_list(v)?,
            Self::DoubleList(v) => writer.write_double_list(v)?,
            Self::Position2D { x, y } | Self::LonLat { lon: x, lat: y } => {
                writer.write_f64(*x);
                writer.write_f64(*y);
            }
            Self::Position3D { x, y, z }
            | Self::LonLatAlt {
                lon: x,
                lat: y,
                alt: z,
            } => {
                writer.write_f64(*x);
                writer.write_f64(*y);
                writer.write_f64(*z);
            }
            Self::RoadMap { road_id, pos, lane } => {
                writer.write_string(road_id)?;
                writer.write_f64(*pos);
                writer.write_u8(*lane);
            }
            Self::Polygon(points) => {
                let count =
                    u8::try_from(points.len()).map_err(|_| WireError::LengthOverflow(points.len()))?;
                writer.write_u8(count);
                for (x, y) in points {
                    writer.write_f64(*x);
                    writer.write_f64(*y);
                }
            }
            Self::Color { r, g, b, a } => {
                writer.write_bytes(&[*r, *g, *b, *a]);
            }
            Self::Compound(items) => {
                writer.write_count(items.len())?;
                for item in items {
                    item.encode(writer)?;
                }
            }
        }
        Ok(())
    }

    /// Encodes into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`TypedValue::encode`].
    pub fn to_bytes(&self) -> WireResult<Vec<u8>> {
        let mut writer = FrameWriter::new();
        self.encode(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Returns the value as a double, widening integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Integer(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Returns the value as an integer.
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as a string list.
    #[must_use]
    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the x/y pair of a 2D or 3D position.
    #[must_use]
    pub const fn as_position(&self) -> Option<(f64, f64)> {
        match self {
            Self::Position2D { x, y } | Self::Position3D { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for TypedValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}
