//! Scripted simulation peer shared by the end-to-end tests.

#![allow(dead_code)]

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use crowdctl_control::{Channel, FrameTransport};
use crowdctl_wire::command::write_length_header;
use crowdctl_wire::constants::{
    CMD_CONTROLLER, GLOBAL_OBJECT_ID, RESPONSE_SUBSCRIBE_PERSON_VARIABLE,
    RESPONSE_SUBSCRIBE_SIM_VARIABLE, VAR_ID_LIST, VAR_TIME,
};
use crowdctl_wire::{Command, FrameWriter, Status, TypedValue};
use parking_lot::Mutex;

/// Everything the controller wrote.
pub type SentLog = Arc<Mutex<Vec<u8>>>;

/// Replays canned frames and records writes.
pub struct ScriptedPeer {
    input: Cursor<Vec<u8>>,
    sent: SentLog,
}

impl ScriptedPeer {
    pub fn new(payloads: Vec<Vec<u8>>) -> (Self, SentLog) {
        let mut raw = Vec::new();
        for payload in payloads {
            raw.extend_from_slice(&((payload.len() + 4) as u32).to_be_bytes());
            raw.extend_from_slice(&payload);
        }
        let sent = SentLog::default();
        let peer = Self {
            input: Cursor::new(raw),
            sent: Arc::clone(&sent),
        };
        (peer, sent)
    }

    pub fn channel(payloads: Vec<Vec<u8>>) -> (Channel, SentLog) {
        let (peer, sent) = Self::new(payloads);
        (Channel::new(FrameTransport::new(peer)), sent)
    }
}

impl Read for ScriptedPeer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedPeer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Splits a write log into frame payloads.
pub fn frames(sent: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = sent;
    while rest.len() >= 4 {
        let total = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        out.push(rest[4..total].to_vec());
        rest = &rest[total..];
    }
    out
}

/// Statuses followed by `body`.
pub fn reply(statuses: &[Status], body: &[u8]) -> Vec<u8> {
    let mut writer = FrameWriter::new();
    for status in statuses {
        status.encode(&mut writer).unwrap();
    }
    writer.write_bytes(body);
    writer.into_bytes()
}

/// One OK status, no body.
pub fn ok(command: u8) -> Vec<u8> {
    reply(&[Status::ok(command)], &[])
}

/// One variable subscription result.
pub fn variables(response: u8, object: &str, vars: &[(u8, TypedValue)]) -> Vec<u8> {
    let mut body = FrameWriter::new();
    body.write_u8(response);
    body.write_string(object).unwrap();
    body.write_u8(vars.len() as u8);
    for (var, value) in vars {
        body.write_u8(*var);
        body.write_u8(0x00);
        value.encode(&mut body).unwrap();
    }
    let mut out = FrameWriter::new();
    write_length_header(&mut out, body.len()).unwrap();
    out.write_bytes(body.as_slice());
    out.into_bytes()
}

/// `i32` count followed by `results`.
pub fn block(results: &[Vec<u8>]) -> Vec<u8> {
    let mut writer = FrameWriter::new();
    writer.write_i32(results.len() as i32);
    for result in results {
        writer.write_bytes(result);
    }
    writer.into_bytes()
}

pub fn strings(list: &[&str]) -> TypedValue {
    TypedValue::StringList(list.iter().map(|s| (*s).to_owned()).collect())
}

/// Simulation globals carrying only the time.
pub fn sim_time(time: f64) -> Vec<u8> {
    variables(RESPONSE_SUBSCRIBE_SIM_VARIABLE, GLOBAL_OBJECT_ID, &[(VAR_TIME, TypedValue::Double(time))])
}

/// The person membership list.
pub fn person_ids(ids: &[&str]) -> Vec<u8> {
    variables(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, GLOBAL_OBJECT_ID, &[(VAR_ID_LIST, strings(ids))])
}

/// Controller message as an orchestrator sends it.
pub fn controller_message(variable: u8, time: f64, trailer: &[u8]) -> Vec<u8> {
    let mut payload = Command::variable(CMD_CONTROLLER, variable, GLOBAL_OBJECT_ID)
        .with_value(&TypedValue::Double(time))
        .unwrap()
        .encode()
        .unwrap();
    payload.extend_from_slice(trailer);
    payload
}
