//! # CROWDCTL Control - Pedestrian Simulation Controller
//!
//! Drives a pedestrian simulation over the control protocol, either as the
//! client that steps it or as the server an orchestrator steps.
//!
//! ## Architecture
//!
//! - **Transport**: framed request/response over one blocking socket
//! - **Domains**: six command ids per entity category, routed by a registry
//! - **Subscriptions**: standing variable requests, reconciled as persons
//!   enter and leave
//! - **Listeners**: turn decoded results into controller-facing state
//! - **Stepping**: fixed or sensor-adaptive choice of the next call time
//! - **Connection**: one state machine for both roles
//!
//! ## Step Exchange
//!
//! ```text
//! CONTROLLER                        SIMULATION
//!     |                                 |
//!     |--- CMD_SIMSTEP(t) ------------->|
//!     |                                 | <- advances to t
//!     |<-- status + result block -------|
//!     |                                 |
//!     | listeners, reconcile, callback  |
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use crowdctl_control::{ClientRole, Connection, FixedTimeStepper, Scheduler};
//!
//! let scheduler = Scheduler::new(Box::new(FixedTimeStepper::new(0.4, 0.0, Some(100.0))?));
//! let mut connection = Connection::connect("127.0.0.1:9999", None, ClientRole::new(), scheduler)?;
//! connection.start(&mut my_controller)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod channel;
pub mod collab;
pub mod config;
pub mod connection;
pub mod controller;
pub mod cycle;
pub mod domain;
pub mod error;
pub mod listener;
pub mod stepper;
pub mod subscription;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use channel::Channel;
pub use collab::{
    CommandSupervisor, DelimitedWriter, FileScenario, ProcessHandle, ProcessSupervisor,
    ResultSink, Scenario, ScenarioSource,
};
pub use config::{ControlConfig, RoleKind, SteppingMode};
pub use connection::{ClientRole, Connection, ConnectionState, Role, ServerRole};
pub use controller::{Controller, StepContext};
pub use cycle::TargetCycleController;
pub use domain::{
    CommandRole, ControlApi, Domain, DomainHandle, DomainRegistry, MiscApi, PersonApi, PolygonApi,
    SimulationApi,
};
pub use error::{ControlError, ControlResult};
pub use listener::{DefaultListener, Listener, Listeners, Pedestrian};
pub use stepper::{
    AdaptiveTimeStepper, DensityBasedStepSize, FixedTimeStepper, NextTime, Scheduler, SensorData,
    StepSizeAlgorithm, TimeStepper, VelocityBasedStepSize,
};
pub use subscription::{SubscriptionEngine, SubscriptionMap, Window};
pub use transport::FrameTransport;

/// Re-export of the wire codec.
pub use crowdctl_wire as wire;
