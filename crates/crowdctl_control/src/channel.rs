//! # Command Channel
//!
//! Everything a controller may send: the transport, the domain routing
//! table and the subscription engine, bundled so one borrow reaches all
//! three.
//!
//! ```text
//! DomainHandle ──┐
//! typed APIs  ───┼──> Channel ──> FrameTransport ──> peer
//! Connection  ───┘        │
//!                         └──> SubscriptionEngine (values, membership)
//! ```

use crowdctl_wire::constants::{
    CMD_CLOSE, CMD_GETVERSION, CMD_LOAD, CMD_SETORDER, CMD_SIMSTEP, GLOBAL_OBJECT_ID,
};
use crowdctl_wire::{Command, FrameReader, TypedValue};

use crate::domain::{Domain, DomainHandle, DomainRegistry};
use crate::error::{ControlError, ControlResult};
use crate::subscription::{SubscriptionEngine, Window};
use crate::transport::{FrameTransport, Response};

/// Transport, routing table and subscriptions of one connection.
#[derive(Debug)]
pub struct Channel {
    transport: FrameTransport,
    registry: DomainRegistry,
    subscriptions: SubscriptionEngine,
}

impl Channel {
    /// Creates a channel with every built-in domain registered.
    #[must_use]
    pub fn new(transport: FrameTransport) -> Self {
        Self::with_registry(transport, DomainRegistry::with_builtin())
    }

    /// Creates a channel with a custom routing table.
    #[must_use]
    pub fn with_registry(transport: FrameTransport, registry: DomainRegistry) -> Self {
        Self {
            transport,
            registry,
            subscriptions: SubscriptionEngine::new(),
        }
    }

    /// The transport.
    #[inline]
    #[must_use]
    pub const fn transport(&self) -> &FrameTransport {
        &self.transport
    }

    /// The transport, mutably.
    #[inline]
    pub fn transport_mut(&mut self) -> &mut FrameTransport {
        &mut self.transport
    }

    /// The routing table.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    /// Registers an additional domain.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::DomainCollision`] if one of its ids is taken.
    pub fn register(&mut self, domain: Domain) -> ControlResult<()> {
        self.registry.register(domain)
    }

    /// The subscription engine.
    #[inline]
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionEngine {
        &self.subscriptions
    }

    /// The subscription engine, mutably.
    #[inline]
    pub fn subscriptions_mut(&mut self) -> &mut SubscriptionEngine {
        &mut self.subscriptions
    }

    /// Handle addressing `domain` through this channel.
    pub fn domain(&mut self, domain: Domain) -> DomainHandle<'_> {
        DomainHandle::new(domain, self)
    }

    /// Reads one variable.
    ///
    /// `parameter` is appended for variables that take an argument.
    ///
    /// # Errors
    ///
    /// - [`ControlError::Command`] if the peer rejected the request
    /// - [`ControlError::FatalProtocol`] if the answer addresses another
    ///   response id, variable or object
    pub fn get(
        &mut self,
        domain: &Domain,
        variable: u8,
        object: &str,
        parameter: Option<&TypedValue>,
    ) -> ControlResult<TypedValue> {
        let mut command = Command::variable(domain.get, variable, object);
        if let Some(parameter) = parameter {
            command = command.with_value(parameter)?;
        }
        self.transport.queue(&command)?;
        let response = self.transport.send_exact()?;

        let mut reader = response.reader();
        let _length = reader.read_length()?;
        let id = reader.read_u8()?;
        let echoed_variable = reader.read_u8()?;
        let echoed_object = reader.read_string()?;
        if id != domain.get_response() || echoed_variable != variable || echoed_object != object {
            return Err(ControlError::FatalProtocol(format!(
                "received answer 0x{id:02x},0x{echoed_variable:02x},{echoed_object:?} \
                 for get command 0x{:02x},0x{variable:02x},{object:?}",
                domain.get
            )));
        }
        Ok(reader.read_value()?)
    }

    /// Writes one variable.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Command`] if the peer rejected the value.
    pub fn set(&mut self, domain: &Domain, variable: u8, object: &str, value: &TypedValue) -> ControlResult<()> {
        let command = Command::variable(domain.set, variable, object).with_value(value)?;
        self.transport.queue(&command)?;
        self.transport.send_exact()?;
        tracing::debug!(domain = domain.name, variable, object, "variable set");
        Ok(())
    }

    /// Subscribes `object` of `domain` to `variables`.
    ///
    /// # Errors
    ///
    /// See [`SubscriptionEngine::subscribe`].
    pub fn subscribe(&mut self, domain: &Domain, object: &str, variables: &[u8], window: Window) -> ControlResult<()> {
        self.subscriptions
            .subscribe(&mut self.transport, &self.registry, domain, object, variables, window)
    }

    /// Removes the subscription of `object`.
    ///
    /// # Errors
    ///
    /// See [`SubscriptionEngine::unsubscribe`].
    pub fn unsubscribe(&mut self, domain: &Domain, object: &str) -> ControlResult<()> {
        self.subscriptions
            .unsubscribe(&mut self.transport, &self.registry, domain, object)
    }

    /// Subscribes to the objects of `context_domain` around `object`.
    ///
    /// # Errors
    ///
    /// See [`SubscriptionEngine::subscribe_context`].
    pub fn subscribe_context(
        &mut self,
        domain: &Domain,
        object: &str,
        context_domain: &Domain,
        distance: f64,
        variables: &[u8],
        window: Window,
    ) -> ControlResult<()> {
        self.subscriptions.subscribe_context(
            &mut self.transport,
            &self.registry,
            domain,
            object,
            context_domain,
            distance,
            variables,
            window,
        )
    }

    /// Parses a subscription result block.
    ///
    /// # Errors
    ///
    /// See [`SubscriptionEngine::parse_result`].
    pub fn parse_result(&mut self, reader: &mut FrameReader<'_>) -> ControlResult<Vec<(String, u8)>> {
        self.subscriptions.parse_result(reader, &self.registry)
    }

    /// Aligns wildcard members of `domain` with `ids`.
    ///
    /// # Errors
    ///
    /// See [`SubscriptionEngine::reconcile`].
    pub fn reconcile(&mut self, domain: &Domain, ids: &[String]) -> ControlResult<crate::subscription::MembershipChange> {
        self.subscriptions
            .reconcile(&mut self.transport, &self.registry, domain, ids)
    }

    /// Advances the simulation to `time` and parses the result block.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::SimulationEnd`] once the peer has nothing
    /// left to simulate.
    pub fn simulation_step(&mut self, time: f64) -> ControlResult<Vec<(String, u8)>> {
        // raw double, no type tag
        let command = Command::new(CMD_SIMSTEP).with_f64(time);
        self.transport.queue(&command)?;
        let response = self.transport.send_exact()?;
        let mut reader = response.reader();
        self.parse_result(&mut reader)
    }

    /// Sends a raw command and returns the response after its status.
    ///
    /// # Errors
    ///
    /// See [`FrameTransport::send_exact`].
    pub fn send_command(&mut self, command: &Command) -> ControlResult<Response> {
        self.transport.queue(command)?;
        self.transport.send_exact()
    }

    /// Queries the API level and identifier of the peer.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::FatalProtocol`] if the answer belongs to
    /// another command.
    pub fn get_version(&mut self) -> ControlResult<(i32, String)> {
        let response = self.send_command(&Command::new(CMD_GETVERSION))?;
        let mut reader = response.reader();
        let _length = reader.read_length()?;
        let id = reader.read_u8()?;
        if id != CMD_GETVERSION {
            return Err(ControlError::FatalProtocol(format!(
                "received answer 0x{id:02x} for command 0x{CMD_GETVERSION:02x}"
            )));
        }
        Ok((reader.read_i32()?, reader.read_string()?))
    }

    /// Loads a simulation from command line style arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Command`] if the peer refused.
    pub fn load(&mut self, args: &[String]) -> ControlResult<()> {
        let command = Command::new(CMD_LOAD).with_value(&TypedValue::StringList(args.to_vec()))?;
        self.send_command(&command).map(drop)
    }

    /// Sets the client order in a multi-client setup.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Command`] if the peer refused.
    pub fn set_order(&mut self, order: i32) -> ControlResult<()> {
        let command = Command::new(CMD_SETORDER).with_i32(order);
        self.send_command(&command).map(drop)
    }

    /// Sends `CMD_CLOSE` and releases the stream.
    ///
    /// The close command is best effort. The stream is released even if
    /// the peer is already gone.
    pub fn close(&mut self) {
        if self.transport.is_open() {
            if let Err(e) = self.send_command(&Command::new(CMD_CLOSE)) {
                tracing::debug!(error = %e, "close not acknowledged");
            }
        }
        self.transport.close();
    }

    /// Latest membership list of `domain`, as reported under the global
    /// object.
    #[must_use]
    pub fn reported_ids(&self, domain: &Domain, variable: u8) -> Option<&[String]> {
        self.subscriptions
            .map()
            .value(domain.subscribe_response, GLOBAL_OBJECT_ID, variable)?
            .as_string_list()
    }
}
