use std::net::TcpListener;
use std::time::Duration;

use crowdctl_wire::constants::{CMD_CONTROLLER, CMD_SIMSTEP, GLOBAL_OBJECT_ID, VAR_INIT};
use crowdctl_wire::{Command, FrameReader, TypedValue};

use super::{Connection, Exchange, Opening, Role};
use crate::channel::Channel;
use crate::error::{ControlError, ControlResult};
use crate::stepper::{NextTime, Scheduler};
use crate::transport::FrameTransport;

/// Driven by an orchestrator that reports steps and asks for the next
/// controller time.
///
/// ```text
/// in:  [len][CMD_CONTROLLER][VAR_INIT   ][""][TYPE_DOUBLE][t]
/// in:  [len][CMD_CONTROLLER][CMD_SIMSTEP][""][TYPE_DOUBLE][t][result block]
/// out: [len][CMD_CONTROLLER][same var   ][""][TYPE_DOUBLE][next, -1 = run to end]
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServerRole {
    /// Variable of the inbound message still waiting for its reply.
    pending: Option<u8>,
}

impl ServerRole {
    /// Creates the role.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reply(channel: &mut Channel, variable: u8, next: NextTime) -> ControlResult<()> {
        let command = Command::variable(CMD_CONTROLLER, variable, GLOBAL_OBJECT_ID)
            .with_value(&TypedValue::Double(next.as_wire()))?;
        channel.transport_mut().send_frame(&command.encode()?)?;
        tracing::debug!(variable, next = next.as_wire(), "next time sent");
        Ok(())
    }
}

/// Reads the controller header of an inbound message.
fn read_control(reader: &mut FrameReader<'_>) -> ControlResult<(u8, f64)> {
    let _length = reader.read_length()?;
    let command = reader.read_u8()?;
    if command != CMD_CONTROLLER {
        return Err(ControlError::FatalProtocol(format!(
            "expected controller command 0x{CMD_CONTROLLER:02x}, received 0x{command:02x}"
        )));
    }
    let variable = reader.read_u8()?;
    let _object = reader.read_string()?;
    let time = reader.read_typed_f64()?;
    Ok((variable, time))
}

impl Role for ServerRole {
    fn name(&self) -> &'static str {
        "server"
    }

    fn begin(&mut self, channel: &mut Channel) -> ControlResult<Opening> {
        let Some(payload) = channel.transport_mut().recv_frame()? else {
            return Ok(Opening::Closed);
        };
        let (variable, time) = read_control(&mut FrameReader::new(&payload))?;
        if variable != VAR_INIT {
            return Err(ControlError::FatalProtocol(format!(
                "expected init, received controller message 0x{variable:02x}"
            )));
        }
        tracing::info!(time, "orchestrator requested initialization");
        self.pending = Some(VAR_INIT);
        Ok(Opening::Init { time: Some(time) })
    }

    fn exchange(&mut self, channel: &mut Channel, next: NextTime) -> ControlResult<Exchange> {
        loop {
            if let Some(variable) = self.pending.take() {
                Self::reply(channel, variable, next)?;
            }

            let Some(payload) = channel.transport_mut().recv_frame()? else {
                tracing::info!("orchestrator closed the connection");
                return Ok(Exchange::Finished);
            };
            let mut reader = FrameReader::new(&payload);
            let (variable, time) = read_control(&mut reader)?;
            if variable != CMD_SIMSTEP {
                return Err(ControlError::FatalProtocol(format!(
                    "expected step, received controller message 0x{variable:02x}"
                )));
            }
            self.pending = Some(CMD_SIMSTEP);

            if next == NextTime::RunToEnd {
                // acknowledged without callbacks until the orchestrator leaves
                tracing::trace!(time, "step after run to end");
                continue;
            }
            channel.parse_result(&mut reader)?;
            return Ok(Exchange::Step { time });
        }
    }

    fn finish(&mut self, channel: &mut Channel) {
        channel.transport_mut().close();
    }
}

impl Connection<ServerRole> {
    /// Server connection over an established channel.
    #[must_use]
    pub fn server(channel: Channel, scheduler: Scheduler) -> Self {
        Self::new(ServerRole::new(), channel, scheduler)
    }

    /// Accepts exactly one orchestrator on `listener`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ControlError::Io`] if accepting fails.
    pub fn accept(listener: &TcpListener, read_timeout: Option<Duration>, scheduler: Scheduler) -> ControlResult<Self> {
        let (transport, _peer) = FrameTransport::accept(listener, read_timeout)?;
        Ok(Self::server(Channel::new(transport), scheduler))
    }
}
