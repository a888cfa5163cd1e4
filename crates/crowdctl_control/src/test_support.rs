//! Scripted peer and frame builders for unit tests.

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use crowdctl_wire::command::write_length_header;
use crowdctl_wire::{FrameWriter, Status, TypedValue};
use parking_lot::Mutex;

/// Log of everything written to a [`ScriptedStream`].
pub type SentLog = Arc<Mutex<Vec<u8>>>;

/// Stream that replays canned bytes and records writes.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    sent: SentLog,
}

impl ScriptedStream {
    /// Replays `payloads`, each wrapped in a frame header.
    pub fn new(payloads: Vec<Vec<u8>>) -> (Self, SentLog) {
        let mut raw = Vec::new();
        for payload in payloads {
            raw.extend_from_slice(&((payload.len() + 4) as u32).to_be_bytes());
            raw.extend_from_slice(&payload);
        }
        Self::from_bytes(raw)
    }

    /// Replays raw bytes as-is.
    pub fn from_bytes(raw: Vec<u8>) -> (Self, SentLog) {
        let sent = SentLog::default();
        let stream = Self {
            input: Cursor::new(raw),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Response payload: status headers followed by `body`.
pub fn status_frame(statuses: &[Status], body: &[u8]) -> Vec<u8> {
    let mut writer = FrameWriter::new();
    for status in statuses {
        status.encode(&mut writer).unwrap();
    }
    writer.write_bytes(body);
    writer.into_bytes()
}

/// One variable subscription result with all statuses OK.
pub fn variable_result(response: u8, object: &str, vars: &[(u8, TypedValue)]) -> Vec<u8> {
    let mut body = FrameWriter::new();
    body.write_u8(response);
    body.write_string(object).unwrap();
    body.write_u8(vars.len() as u8);
    for (var, value) in vars {
        body.write_u8(*var);
        body.write_u8(0x00);
        value.encode(&mut body).unwrap();
    }
    with_length(&body)
}

/// One context subscription result.
pub fn context_result(
    response: u8,
    owner: &str,
    context_domain: u8,
    vars: &[u8],
    members: &[(&str, Vec<TypedValue>)],
) -> Vec<u8> {
    let mut body = FrameWriter::new();
    body.write_u8(response);
    body.write_string(owner).unwrap();
    body.write_u8(context_domain);
    body.write_u8(vars.len() as u8);
    body.write_i32(members.len() as i32);
    for (member, values) in members {
        body.write_string(member).unwrap();
        for (var, value) in vars.iter().zip(values) {
            body.write_u8(*var);
            body.write_u8(0x00);
            value.encode(&mut body).unwrap();
        }
    }
    with_length(&body)
}

/// A result block: `i32` count followed by the given results.
pub fn result_block(results: &[Vec<u8>]) -> Vec<u8> {
    let mut writer = FrameWriter::new();
    writer.write_i32(results.len() as i32);
    for result in results {
        writer.write_bytes(result);
    }
    writer.into_bytes()
}

fn with_length(body: &FrameWriter) -> Vec<u8> {
    let mut out = FrameWriter::new();
    write_length_header(&mut out, body.len()).unwrap();
    out.write_bytes(body.as_slice());
    out.into_bytes()
}

/// Full response payload to a get command.
pub fn get_response(command: u8, variable: u8, object: &str, value: &TypedValue) -> Vec<u8> {
    let mut body = FrameWriter::new();
    body.write_u8(command + 0x10);
    body.write_u8(variable);
    body.write_string(object).unwrap();
    value.encode(&mut body).unwrap();
    status_frame(&[Status::ok(command)], &with_length(&body))
}

/// Response payload to a command whose status is OK and carries no body.
pub fn ack(command: u8) -> Vec<u8> {
    status_frame(&[Status::ok(command)], &[])
}
