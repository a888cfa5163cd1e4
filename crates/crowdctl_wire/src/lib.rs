//! # CROWDCTL Wire - Control Protocol Codec
//!
//! Byte-exact encoding and decoding for the pedestrian-simulation control
//! protocol. This crate never touches a socket.
//!
//! ## Architecture
//!
//! - **Values**: tagged union of scalars, lists, positions, colors, polygons
//! - **Commands**: short/long length headers, variable and subscription addressing
//! - **Frames**: `u32` total length prefix around one or more commands
//! - **Status**: per-command result header with latin-1 message
//!
//! ## Request / Response
//!
//! ```text
//! CONTROLLER                        SIMULATION
//!     |                                 |
//!     |--- [len][cmd][cmd]... --------->|
//!     |                                 | <- executes in order
//!     |<-- [len][status][status]... ----|
//!     |                                 |
//! ```
//!
//! All integers are big-endian. Responses arrive in the order commands
//! were queued.
//!
//! ## Example
//!
//! ```rust
//! use crowdctl_wire::{constants::CMD_SIMSTEP, Command, Frame};
//!
//! let command = Command::new(CMD_SIMSTEP).with_f64(5.0).encode().unwrap();
//! let frame = Frame::encode(&command).unwrap();
//! assert_eq!(frame.len(), 14);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod constants;
pub mod error;
pub mod reader;
pub mod status;
pub mod value;
pub mod writer;

pub use command::{Command, Frame, Target};
pub use error::{WireError, WireResult};
pub use reader::FrameReader;
pub use status::{ResultCode, Status};
pub use value::{TypeTag, TypedValue};
pub use writer::FrameWriter;
