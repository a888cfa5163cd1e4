//! # Transport Layer
//!
//! Length-prefixed frame exchange over a blocking byte stream.
//!
//! ## Design
//!
//! - One frame per batch of queued commands
//! - Two-phase read: 4-byte length, then exactly that many payload bytes
//! - One status header per queued command, consumed in queue order
//! - The queue is cleared after every exchange, successful or not

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crowdctl_wire::{Command, Frame, FrameReader, FrameWriter, ResultCode, Status};

use crate::error::{ControlError, ControlResult};

/// A blocking, bidirectional byte stream.
pub trait DuplexStream: Read + Write + Send {}

impl<T: Read + Write + Send> DuplexStream for T {}

/// Frame transport over a single stream.
///
/// Owns the stream for its whole lifetime. Once closed (explicitly or
/// because the peer went away) every exchange fails with
/// [`ControlError::ConnectionClosed`].
pub struct FrameTransport {
    /// The underlying stream, `None` once released.
    stream: Option<Box<dyn DuplexStream>>,
    /// Encoded commands waiting to be sent.
    outgoing: FrameWriter,
    /// Ids of the queued commands, in queue order.
    queue: Vec<u8>,
    /// Statistics.
    stats: TransportStats,
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames sent.
    pub frames_sent: u64,
    /// Frames received.
    pub frames_received: u64,
    /// Bytes sent, frame headers included.
    pub bytes_sent: u64,
    /// Bytes received, frame headers included.
    pub bytes_received: u64,
    /// Commands sent.
    pub commands_sent: u64,
    /// Commands rejected by the peer.
    pub commands_failed: u64,
}

/// A response frame whose status headers were all OK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Vec<u8>,
    body_start: usize,
}

impl Response {
    /// Returns a reader positioned after the status headers.
    #[must_use]
    pub fn reader(&self) -> FrameReader<'_> {
        FrameReader::new(&self.payload[self.body_start..])
    }

    /// Returns true if nothing follows the status headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body_start >= self.payload.len()
    }
}

impl FrameTransport {
    /// Wraps an already connected stream.
    #[must_use]
    pub fn new(stream: impl DuplexStream + 'static) -> Self {
        Self {
            stream: Some(Box::new(stream)),
            outgoing: FrameWriter::new(),
            queue: Vec::new(),
            stats: TransportStats::default(),
        }
    }

    /// Connects to a simulation listening on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] if the connection cannot be established.
    pub fn connect(addr: impl ToSocketAddrs, read_timeout: Option<Duration>) -> ControlResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(read_timeout)?;
        tracing::info!(peer = ?stream.peer_addr().ok(), "connected to simulation");
        Ok(Self::new(stream))
    }

    /// Accepts exactly one peer on `listener`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] if accepting fails.
    pub fn accept(listener: &TcpListener, read_timeout: Option<Duration>) -> ControlResult<(Self, SocketAddr)> {
        tracing::info!(local = ?listener.local_addr().ok(), "waiting for orchestrator");
        let (stream, peer) = listener.accept()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(read_timeout)?;
        tracing::info!(%peer, "orchestrator connected");
        Ok((Self::new(stream), peer))
    }

    /// Returns true while the stream is held.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns statistics.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Returns the ids of the queued commands.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> &[u8] {
        &self.queue
    }

    /// Appends a command to the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Wire`] if the command cannot be encoded.
    pub fn queue(&mut self, command: &Command) -> ControlResult<()> {
        command.encode_into(&mut self.outgoing)?;
        self.queue.push(command.id());
        Ok(())
    }

    /// Drops every queued command.
    pub fn clear(&mut self) {
        self.outgoing.reset();
        self.queue.clear();
    }

    /// Sends all queued commands as one frame and checks one status per
    /// command.
    ///
    /// # Errors
    ///
    /// - [`ControlError::Command`], [`ControlError::NotImplemented`] or
    ///   [`ControlError::SimulationEnd`] if the peer rejected a command
    /// - [`ControlError::FatalProtocol`] if a status echoes the wrong id
    /// - [`ControlError::ConnectionClosed`] if the peer closed the stream
    pub fn send_exact(&mut self) -> ControlResult<Response> {
        let result = self.exchange();
        self.clear();
        result
    }

    fn exchange(&mut self) -> ControlResult<Response> {
        // 1. Ship the batch
        let frame = Frame::encode(self.outgoing.as_slice())?;
        self.write_all(&frame)?;
        self.stats.commands_sent += self.queue.len() as u64;

        // 2. Two-phase read of the answer
        let Some(payload) = self.recv_frame()? else {
            tracing::warn!("peer closed the connection while a response was pending");
            self.close();
            return Err(ControlError::ConnectionClosed);
        };

        // 3. One status per queued command, in order
        let mut reader = FrameReader::new(&payload);
        for &expected in &self.queue {
            let status = reader.read_status()?;
            if !status.is_ok() {
                self.stats.commands_failed += 1;
                return Err(status_error(status));
            }
            if status.command != expected {
                return Err(ControlError::FatalProtocol(format!(
                    "received answer 0x{:02x} for command 0x{expected:02x}",
                    status.command
                )));
            }
            if !status.message.is_empty() {
                tracing::debug!(command = expected, message = %status.message, "status message");
            }
        }

        let body_start = reader.position();
        Ok(Response {
            payload,
            body_start,
        })
    }

    /// Receives one frame payload.
    ///
    /// Returns `None` if the peer closed the stream cleanly at a frame
    /// boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::ConnectionClosed`] if the stream ends inside
    /// a frame. The stream is released.
    pub fn recv_frame(&mut self) -> ControlResult<Option<Vec<u8>>> {
        let result = self.read_frame();
        self.release_if_closed(result)
    }

    fn read_frame(&mut self) -> ControlResult<Option<Vec<u8>>> {
        let stream = self.stream.as_mut().ok_or(ControlError::ConnectionClosed)?;

        let Some(header) = read_header(stream.as_mut()).map_err(map_io)? else {
            return Ok(None);
        };
        let len = Frame::payload_len(header)?;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).map_err(map_io)?;

        self.stats.frames_received += 1;
        self.stats.bytes_received += (len + Frame::HEADER_LEN) as u64;
        tracing::trace!(len, "frame received");
        Ok(Some(payload))
    }

    /// Sends `payload` as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::ConnectionClosed`] if the stream is gone.
    pub fn send_frame(&mut self, payload: &[u8]) -> ControlResult<()> {
        let frame = Frame::encode(payload)?;
        self.write_all(&frame)
    }

    fn write_all(&mut self, frame: &[u8]) -> ControlResult<()> {
        let result = self.write_frame(frame);
        self.release_if_closed(result)
    }

    fn write_frame(&mut self, frame: &[u8]) -> ControlResult<()> {
        let stream = self.stream.as_mut().ok_or(ControlError::ConnectionClosed)?;
        stream.write_all(frame).map_err(map_io)?;
        stream.flush().map_err(map_io)?;
        self.stats.frames_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;
        tracing::trace!(len = frame.len(), "frame sent");
        Ok(())
    }

    /// Releases the stream once the peer is gone.
    fn release_if_closed<T>(&mut self, result: ControlResult<T>) -> ControlResult<T> {
        if matches!(result, Err(ControlError::ConnectionClosed)) && self.is_open() {
            tracing::warn!("peer went away, releasing the stream");
            self.close();
        }
        result
    }

    /// Releases the stream.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(stats = ?self.stats, "transport closed");
        }
        self.clear();
    }
}

impl std::fmt::Debug for FrameTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransport")
            .field("open", &self.is_open())
            .field("queue", &self.queue)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Maps a non-OK status to its error.
#[must_use]
pub fn status_error(status: Status) -> ControlError {
    if status.is_simulation_end() {
        return ControlError::SimulationEnd;
    }
    match status.code {
        ResultCode::NotImplemented => ControlError::NotImplemented {
            command: status.command,
            message: status.message,
        },
        code => ControlError::Command {
            command: status.command,
            code,
            message: status.message,
        },
    }
}

fn read_header<R: Read + ?Sized>(stream: &mut R) -> io::Result<Option<[u8; 4]>> {
    let mut header = [0u8; Frame::HEADER_LEN];
    let mut filled = 0;
    while filled < header.len() {
        match stream.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Some(header))
}

fn map_io(err: io::Error) -> ControlError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => ControlError::ConnectionClosed,
        _ => ControlError::Io(err),
    }
}
