use crowdctl_wire::constants::{CMD_FILE_SEND, CMD_SIM_STATE};
use crowdctl_wire::Command;

use super::{Domain, DomainHandle};
use crate::channel::Channel;
use crate::error::ControlResult;
use crate::subscription::SubscriptionMap;

/// Scenario upload and state queries.
#[derive(Debug)]
pub struct ControlApi<'a> {
    handle: DomainHandle<'a>,
}

impl<'a> ControlApi<'a> {
    /// Creates the accessor.
    pub fn new(channel: &'a mut Channel) -> Self {
        Self {
            handle: channel.domain(Domain::CONTROL),
        }
    }

    /// The untyped handle underneath.
    pub fn handle(&mut self) -> &mut DomainHandle<'a> {
        &mut self.handle
    }

    /// Uploads a scenario file.
    ///
    /// Layout: `[CMD_FILE_SEND][string name][string content]`, raw strings
    /// without type tags.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ControlError::Command`] if the simulation rejects
    /// the scenario.
    pub fn send_file(&mut self, name: &str, content: &str) -> ControlResult<()> {
        let mut command = Command::new(CMD_FILE_SEND);
        command.payload_mut().write_string(name)?;
        command.payload_mut().write_string(content)?;
        self.handle.channel().send_command(&command)?;
        tracing::info!(name, bytes = content.len(), "scenario sent");
        Ok(())
    }

    /// Reads the current subscription results at `time` without stepping.
    ///
    /// The results come back as a map of their own. The values listeners
    /// see for the current step stay as they are.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn sim_state(&mut self, time: f64) -> ControlResult<SubscriptionMap> {
        // raw double, no type tag
        let command = Command::new(CMD_SIM_STATE).with_f64(time);
        let channel = self.handle.channel();
        let response = channel.send_command(&command)?;
        let mut reader = response.reader();
        SubscriptionMap::parse(&mut reader, channel.registry())
    }
}
