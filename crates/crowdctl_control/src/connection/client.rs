use std::net::ToSocketAddrs;
use std::time::Duration;

use super::{Connection, Exchange, Opening, Role};
use crate::channel::Channel;
use crate::collab::Scenario;
use crate::domain::ControlApi;
use crate::error::ControlResult;
use crate::stepper::{NextTime, Scheduler};
use crate::transport::FrameTransport;

/// Drives the simulation by sending `CMD_SIMSTEP` itself.
#[derive(Debug, Clone, Default)]
pub struct ClientRole {
    scenario: Option<Scenario>,
}

impl ClientRole {
    /// Creates a client role that uses whatever scenario the simulation
    /// already loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `scenario` before subscribing.
    #[must_use]
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Some(scenario);
        self
    }
}

impl Role for ClientRole {
    fn name(&self) -> &'static str {
        "client"
    }

    fn begin(&mut self, channel: &mut Channel) -> ControlResult<Opening> {
        if let Some(scenario) = &self.scenario {
            ControlApi::new(channel).send_file(&scenario.name, &scenario.content)?;
        }
        Ok(Opening::Init { time: None })
    }

    fn exchange(&mut self, channel: &mut Channel, next: NextTime) -> ControlResult<Exchange> {
        let NextTime::At(time) = next else {
            tracing::info!("schedule reached its end, leaving the simulation running");
            return Ok(Exchange::Finished);
        };
        channel.simulation_step(time)?;
        tracing::debug!(time, "stepped");
        Ok(Exchange::Step { time })
    }

    fn finish(&mut self, channel: &mut Channel) {
        channel.close();
    }
}

impl Connection<ClientRole> {
    /// Client connection over an established channel.
    #[must_use]
    pub fn client(role: ClientRole, channel: Channel, scheduler: Scheduler) -> Self {
        Self::new(role, channel, scheduler)
    }

    /// Connects to a simulation listening on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ControlError::Io`] if the connection fails.
    pub fn connect(
        addr: impl ToSocketAddrs,
        read_timeout: Option<Duration>,
        role: ClientRole,
        scheduler: Scheduler,
    ) -> ControlResult<Self> {
        let transport = FrameTransport::connect(addr, read_timeout)?;
        Ok(Self::client(role, Channel::new(transport), scheduler))
    }
}
