//! # Connection State Machine
//!
//! One machine drives both roles. The [`Role`] decides how a step is
//! triggered: a client sends `CMD_SIMSTEP` itself, a server waits for the
//! orchestrator to report one.
//!
//! ```text
//! Created ──start()──> Initializing ──init done──> Running
//!                           │                         │
//!                           └──── error / end ────────┴──> Stopping ──> Closed
//! ```
//!
//! ## Step Pipeline
//!
//! ```text
//! results parsed ──> notify ──> membership pass ──> notify ──> callback ──> clear
//! ```
//!
//! ## Errors
//!
//! - normal termination (`SimulationEnd`, `NotImplemented`): `start()`
//!   returns `Ok`
//! - a rejected controller command: logged, the run continues
//! - anything fatal: returned from `start()`
//!
//! `cleanup()` runs exactly once on every path.

mod client;
mod server;

pub use client::ClientRole;
pub use server::ServerRole;

use std::collections::BTreeMap;

use crate::channel::Channel;
use crate::controller::{Controller, StepContext};
use crate::domain::Domain;
use crate::error::{ControlError, ControlResult};
use crate::listener::{Listener, Listeners};
use crate::stepper::{NextTime, Scheduler};
use crate::subscription::{Window, ALL_OBJECTS};

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started yet.
    Created,
    /// Subscribing and calling `handle_init`.
    Initializing,
    /// Stepping.
    Running,
    /// Running cleanup.
    Stopping,
    /// Transport released.
    Closed,
}

/// Outcome of opening a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Opening {
    /// Initialize. `time` is the simulation time the peer reported, if any.
    Init {
        /// Reported simulation time.
        time: Option<f64>,
    },
    /// The peer went away before initialization.
    Closed,
}

/// Outcome of one step exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exchange {
    /// The simulation advanced to `time` and new results are parsed.
    Step {
        /// Simulation time of the step.
        time: f64,
    },
    /// Nothing left to do.
    Finished,
}

/// How a connection triggers and acknowledges steps.
pub trait Role {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Opens the run.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::FatalProtocol`] if the peer opens with
    /// anything but an initialization.
    fn begin(&mut self, channel: &mut Channel) -> ControlResult<Opening>;

    /// Hands `next` to the peer and waits for the next step.
    ///
    /// # Errors
    ///
    /// Propagates transport, peer and protocol errors.
    fn exchange(&mut self, channel: &mut Channel, next: NextTime) -> ControlResult<Exchange>;

    /// Releases the transport.
    fn finish(&mut self, channel: &mut Channel);
}

#[derive(Debug, Clone, Copy)]
enum Callback {
    Init,
    Step,
}

/// A controller run over one transport.
#[derive(Debug)]
pub struct Connection<R: Role> {
    role: R,
    channel: Channel,
    listeners: Listeners,
    scheduler: Scheduler,
    state: ConnectionState,
    current_time: Option<f64>,
}

impl<R: Role> Connection<R> {
    /// Creates a connection with the default listener only.
    #[must_use]
    pub fn new(role: R, channel: Channel, scheduler: Scheduler) -> Self {
        Self {
            role,
            channel,
            listeners: Listeners::default(),
            scheduler,
            state: ConnectionState::Created,
            current_time: None,
        }
    }

    /// Replaces the listener collection.
    #[must_use]
    pub fn with_listeners(mut self, listeners: Listeners) -> Self {
        self.listeners = listeners;
        self
    }

    /// Adds a listener.
    pub fn add_listener(&mut self, listener: Box<dyn Listener>) {
        self.listeners.add(listener);
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Simulation time of the last callback.
    #[inline]
    #[must_use]
    pub const fn current_time(&self) -> Option<f64> {
        self.current_time
    }

    /// The channel.
    #[must_use]
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// The listeners.
    #[must_use]
    pub const fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// The schedule.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs until the simulation ends, the peer leaves or a fatal error
    /// occurs.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that ended the run. Normal termination is
    /// `Ok`. Starting twice is a [`ControlError::Config`] error.
    pub fn start(&mut self, controller: &mut dyn Controller) -> ControlResult<()> {
        if self.state != ConnectionState::Created {
            return Err(ControlError::Config("a connection can only be started once".into()));
        }
        tracing::info!(role = self.role.name(), "connection starting");

        let result = self.run(controller);

        self.transition(ConnectionState::Stopping);
        controller.cleanup();
        self.role.finish(&mut self.channel);
        self.transition(ConnectionState::Closed);

        match result {
            Err(e) if e.is_normal_termination() => {
                tracing::info!(reason = %e, "simulation finished");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "connection failed");
                Err(e)
            }
            Ok(()) => {
                tracing::info!(stats = ?self.channel.transport().stats(), "connection closed");
                Ok(())
            }
        }
    }

    fn run(&mut self, controller: &mut dyn Controller) -> ControlResult<()> {
        // 1. Opening
        self.transition(ConnectionState::Initializing);
        let hint = match self.role.begin(&mut self.channel)? {
            Opening::Init { time } => time,
            Opening::Closed => {
                tracing::info!("peer closed before initialization");
                return Ok(());
            }
        };

        // 2. Initial subscriptions, their first results arrive with the replies
        self.subscribe_interest()?;
        self.refresh()?;
        self.current_time = Some(
            self.listeners
                .default_listener()
                .time()
                .or(hint)
                .unwrap_or_else(|| self.scheduler.stepper().time()),
        );
        self.dispatch(controller, Callback::Init)?;
        self.channel.transport_mut().clear();
        self.transition(ConnectionState::Running);

        // 3. Step loop
        loop {
            let next = self.scheduler.next()?;
            match self.role.exchange(&mut self.channel, next)? {
                Exchange::Finished => return Ok(()),
                Exchange::Step { time } => {
                    self.refresh()?;
                    self.current_time = Some(self.listeners.default_listener().time().unwrap_or(time));
                    self.dispatch(controller, Callback::Step)?;
                    self.channel.transport_mut().clear();
                }
            }
        }
    }

    fn subscribe_interest(&mut self) -> ControlResult<()> {
        // (subscribe id, object) -> (domain, variables), merged across listeners
        let mut requests: BTreeMap<(u8, String), (Domain, Vec<u8>)> = BTreeMap::new();

        for listener in self.listeners.iter() {
            if !listener.subscribes_initially() {
                tracing::debug!(listener = listener.name(), "listener opted out of initial subscription");
                continue;
            }
            for (response, objects) in listener.interest() {
                let domain = self
                    .channel
                    .registry()
                    .for_subscription_response(response)
                    .ok_or(ControlError::UnknownDomain(response))?;
                for (object, variables) in objects {
                    if object == ALL_OBJECTS {
                        self.channel.subscriptions_mut().add_wildcard(&domain, &variables);
                        continue;
                    }
                    let (_, merged) = requests
                        .entry((domain.subscribe, object))
                        .or_insert_with(|| (domain, Vec::new()));
                    for var in variables {
                        if !merged.contains(&var) {
                            merged.push(var);
                        }
                    }
                }
            }
        }

        for ((_, object), (domain, variables)) in &requests {
            self.channel.subscribe(domain, object, variables, Window::ALWAYS)?;
        }
        tracing::info!(subscriptions = requests.len(), "initial subscriptions in place");
        Ok(())
    }

    fn refresh(&mut self) -> ControlResult<()> {
        self.listeners.notify(self.channel.subscriptions().map());
        let ids = self.listeners.default_listener().pedestrian_ids().to_vec();
        self.channel.reconcile(&Domain::PERSON, &ids)?;
        self.listeners.notify(self.channel.subscriptions().map());
        Ok(())
    }

    fn dispatch(&mut self, controller: &mut dyn Controller, callback: Callback) -> ControlResult<()> {
        let time = self.current_time.unwrap_or_default();
        let mut ctx = StepContext::new(time, &mut self.channel, &self.listeners, &mut self.scheduler);
        let result = match callback {
            Callback::Init => controller.handle_init(&mut ctx),
            Callback::Step => controller.handle_sim_step(&mut ctx),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() || e.is_normal_termination() => Err(e),
            Err(e) => {
                tracing::warn!(?callback, time, error = %e, "controller command rejected");
                Ok(())
            }
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        tracing::debug!(from = ?self.state, ?to, "connection state");
        self.state = to;
    }
}
