//! # Controller Callbacks
//!
//! A [`Controller`] is called once after initialization and once per
//! simulation step. Each call gets a [`StepContext`] giving access to the
//! listener state, the domain accessors and the schedule, never to the
//! socket itself.

use crate::channel::Channel;
use crate::domain::{ControlApi, Domain, DomainHandle, MiscApi, PersonApi, PolygonApi, SimulationApi};
use crate::error::ControlResult;
use crate::listener::{DefaultListener, Listener, Listeners};
use crate::stepper::Scheduler;

/// User logic driven by a connection.
pub trait Controller {
    /// Called once after the initial subscriptions are in place.
    ///
    /// # Errors
    ///
    /// Fatal errors end the run. A rejected command is logged and the run
    /// continues.
    fn handle_init(&mut self, ctx: &mut StepContext<'_>) -> ControlResult<()>;

    /// Called after every simulation step.
    ///
    /// # Errors
    ///
    /// Fatal errors end the run. A rejected command is logged and the run
    /// continues.
    fn handle_sim_step(&mut self, ctx: &mut StepContext<'_>) -> ControlResult<()>;

    /// Called exactly once when the connection stops, on every path.
    fn cleanup(&mut self) {}
}

/// What a callback may see and do.
pub struct StepContext<'a> {
    time: f64,
    channel: &'a mut Channel,
    listeners: &'a Listeners,
    scheduler: &'a mut Scheduler,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        time: f64,
        channel: &'a mut Channel,
        listeners: &'a Listeners,
        scheduler: &'a mut Scheduler,
    ) -> Self {
        Self {
            time,
            channel,
            listeners,
            scheduler,
        }
    }

    /// Current simulation time.
    #[inline]
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Every listener.
    #[inline]
    #[must_use]
    pub const fn listeners(&self) -> &Listeners {
        self.listeners
    }

    /// The listener tracking persons and time.
    #[must_use]
    pub const fn default_listener(&self) -> &DefaultListener {
        self.listeners.default_listener()
    }

    /// A listener by name and concrete type.
    #[must_use]
    pub fn listener<T: Listener>(&self, name: &str) -> Option<&T> {
        self.listeners.get::<T>(name)
    }

    /// Person accessor.
    pub fn persons(&mut self) -> PersonApi<'_> {
        PersonApi::new(self.channel)
    }

    /// Target changer, stimulus and dissemination accessor.
    pub fn misc(&mut self) -> MiscApi<'_> {
        MiscApi::new(self.channel)
    }

    /// Simulation globals accessor.
    pub fn simulation(&mut self) -> SimulationApi<'_> {
        SimulationApi::new(self.channel)
    }

    /// Polygon accessor.
    pub fn polygons(&mut self) -> PolygonApi<'_> {
        PolygonApi::new(self.channel)
    }

    /// Control channel accessor.
    pub fn control(&mut self) -> ControlApi<'_> {
        ControlApi::new(self.channel)
    }

    /// Untyped access to any registered domain.
    pub fn domain(&mut self, domain: Domain) -> DomainHandle<'_> {
        self.channel.domain(domain)
    }

    /// Requests the next call at absolute time `time`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ControlError::NonMonotonicTime`] if `time` does not
    /// lie after the current schedule time.
    pub fn next_call_at(&mut self, time: f64) -> ControlResult<()> {
        self.scheduler.request_at(time)
    }

    /// Requests the next call `delta` seconds from now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ControlError::NonMonotonicTime`] unless `delta > 0`.
    pub fn next_call_in(&mut self, delta: f64) -> ControlResult<()> {
        self.scheduler.request_in(delta)
    }

    /// Feeds one sensor reading to an adaptive schedule.
    pub fn report_sensor(&mut self, reading: f64) {
        self.scheduler.report_sensor(reading);
    }
}

impl std::fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("time", &self.time)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
