//! # Control Error Types
//!
//! All errors that can occur while driving a simulation.
//!
//! ```text
//! fatal            Wire, FatalProtocol, ConnectionClosed, NonMonotonicTime, ...
//! local            Command (peer rejected one command, connection stays up)
//! normal end       SimulationEnd, NotImplemented
//! ```

use crowdctl_wire::{ResultCode, WireError};
use thiserror::Error;

/// Errors that can occur in the control layer.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Malformed bytes on the wire.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The peer rejected a command.
    #[error("command 0x{command:02x} failed ({}): {message}", code.label())]
    Command {
        /// Command id the status belongs to.
        command: u8,
        /// Result code reported by the peer.
        code: ResultCode,
        /// Message reported by the peer.
        message: String,
    },

    /// The peer does not implement a command.
    #[error("command 0x{command:02x} not implemented: {message}")]
    NotImplemented {
        /// Command id the status belongs to.
        command: u8,
        /// Message reported by the peer.
        message: String,
    },

    /// The simulation reached its natural end.
    #[error("simulation end reached")]
    SimulationEnd,

    /// The peer desynchronized.
    #[error("fatal protocol error: {0}")]
    FatalProtocol(String),

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A time stepper tried to stand still or move backwards.
    #[error("non-monotonic time: next {next} is not after current {current}")]
    NonMonotonicTime {
        /// Time the schedule is at.
        current: f64,
        /// Time that was requested.
        next: f64,
    },

    /// Invalid time stepper parameters.
    #[error("invalid step size: {0}")]
    InvalidStepSize(String),

    /// Two domains claim the same command id.
    #[error("command id 0x{id:02x} claimed by domain {claimed} is owned by domain {owner}")]
    DomainCollision {
        /// Contested command id.
        id: u8,
        /// Domain already owning the id.
        owner: &'static str,
        /// Domain trying to register the id.
        claimed: &'static str,
    },

    /// No registered domain owns a command id.
    #[error("no domain registered for command id 0x{0:02x}")]
    UnknownDomain(u8),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Socket or file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Scenario file could not be provided.
    #[error("scenario error: {0}")]
    Scenario(String),
}

impl ControlError {
    /// Returns true if the error ends the connection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Command { .. } | Self::NotImplemented { .. } | Self::SimulationEnd
        )
    }

    /// Returns true if the error marks a normal end of the run.
    #[must_use]
    pub const fn is_normal_termination(&self) -> bool {
        matches!(self, Self::NotImplemented { .. } | Self::SimulationEnd)
    }
}

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;
