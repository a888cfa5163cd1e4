//! # Controller Configuration
//!
//! One TOML file per run, loaded once at startup.
//!
//! ```toml
//! [connection]
//! role = "client"          # or "server"
//! host = "127.0.0.1"
//! port = 9999
//! read_timeout_ms = 30000
//!
//! [scenario]
//! path = "corridor.scenario"
//!
//! [stepping]
//! mode = "fixed"           # "velocity" or "density" for adaptive stepping
//! step = 0.4
//! start = 0.0
//! end = 100.0
//!
//! [listener]
//! variables = ["pos", "target_list"]
//!
//! [supervisor]
//! command = ["java", "-jar", "vadere-server.jar"]
//! log = "simulator.log"
//!
//! [controller]
//! targets = [["2"], ["3"]]
//! interval = 5.0
//! output = "targets.txt"
//! ```
//!
//! Every section is optional. Missing values fall back to the defaults
//! below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crowdctl_wire::constants::{
    VAR_ANGLE, VAR_HAS_NEXT_TARGET, VAR_INFORMATION_ITEM, VAR_MAXSPEED, VAR_NEXT_TARGET_LIST_INDEX,
    VAR_POSITION, VAR_POSITION3D, VAR_SPEED, VAR_TARGET_LIST, VAR_TYPE, VAR_VELOCITY,
};
use serde::Deserialize;

use crate::collab::DelimitedWriter;
use crate::cycle::{TargetCycleController, CYCLE_COLUMNS};
use crate::error::{ControlError, ControlResult};
use crate::listener::DefaultListener;
use crate::stepper::{
    AdaptiveTimeStepper, DensityBasedStepSize, FixedTimeStepper, Scheduler, TimeStepper,
    VelocityBasedStepSize, DEFAULT_DISCRETIZATION,
};

/// Person variables the default listener can subscribe by name.
pub const PERSON_VARIABLES: &[(&str, u8)] = &[
    ("pos", VAR_POSITION),
    ("pos3d", VAR_POSITION3D),
    ("speed", VAR_SPEED),
    ("max_speed", VAR_MAXSPEED),
    ("velocity", VAR_VELOCITY),
    ("angle", VAR_ANGLE),
    ("type", VAR_TYPE),
    ("target_list", VAR_TARGET_LIST),
    ("next_target_list_index", VAR_NEXT_TARGET_LIST_INDEX),
    ("has_next_target", VAR_HAS_NEXT_TARGET),
    ("information_item", VAR_INFORMATION_ITEM),
];

fn default_host() -> String {
    "127.0.0.1".into()
}
const fn default_port() -> u16 {
    9999
}
const fn default_step() -> f64 {
    DEFAULT_DISCRETIZATION
}
const fn default_min_step() -> f64 {
    0.4
}
const fn default_max_step() -> f64 {
    60.0
}
const fn default_factor() -> f64 {
    10.0
}
fn default_variables() -> Vec<String> {
    vec!["pos".into(), "target_list".into()]
}

/// Which side of the socket the controller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Connects to the simulation and steps it.
    #[default]
    Client,
    /// Accepts one orchestrator and answers its step reports.
    Server,
}

/// `[connection]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Role of this process.
    #[serde(default)]
    pub role: RoleKind,
    /// Peer host as client, bind host as server.
    #[serde(default = "default_host")]
    pub host: String,
    /// Peer port as client, bind port as server.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Socket read timeout. No timeout if absent.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            role: RoleKind::default(),
            host: default_host(),
            port: default_port(),
            read_timeout_ms: None,
        }
    }
}

impl ConnectionConfig {
    /// `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Read timeout as a duration.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// `[scenario]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario file uploaded before subscribing (client role only).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// How the next controller time is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SteppingMode {
    /// Constant step.
    #[default]
    Fixed,
    /// Adaptive, sensors report velocities.
    Velocity,
    /// Adaptive, sensors report densities.
    Density,
}

/// `[stepping]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SteppingConfig {
    /// Stepping mode.
    #[serde(default)]
    pub mode: SteppingMode,
    /// Fixed step size in seconds.
    #[serde(default = "default_step")]
    pub step: f64,
    /// First controller time.
    #[serde(default)]
    pub start: f64,
    /// Last controller time. Open ended if absent.
    #[serde(default)]
    pub end: Option<f64>,
    /// Smallest adaptive step.
    #[serde(default = "default_min_step")]
    pub min_step: f64,
    /// Largest adaptive step, used when no sensor reported.
    #[serde(default = "default_max_step")]
    pub max_step: f64,
    /// Seconds of step per unit of velocity.
    #[serde(default = "default_factor")]
    pub factor: f64,
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self {
            mode: SteppingMode::default(),
            step: default_step(),
            start: 0.0,
            end: None,
            min_step: default_min_step(),
            max_step: default_max_step(),
            factor: default_factor(),
        }
    }
}

impl SteppingConfig {
    /// Builds the configured stepper.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] for invalid parameters.
    pub fn stepper(&self) -> ControlResult<Box<dyn TimeStepper>> {
        let stepper: Box<dyn TimeStepper> = match self.mode {
            SteppingMode::Fixed => Box::new(FixedTimeStepper::new(self.step, self.start, self.end)?),
            SteppingMode::Velocity => Box::new(AdaptiveTimeStepper::new(
                Box::new(VelocityBasedStepSize::new(self.min_step, self.max_step, self.factor)?),
                self.start,
                self.end,
            )?),
            SteppingMode::Density => Box::new(AdaptiveTimeStepper::new(
                Box::new(DensityBasedStepSize::new(self.min_step, self.max_step, self.factor)?),
                self.start,
                self.end,
            )?),
        };
        Ok(stepper)
    }

    /// Builds a scheduler around the configured stepper.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidStepSize`] for invalid parameters.
    pub fn scheduler(&self) -> ControlResult<Scheduler> {
        Ok(Scheduler::new(self.stepper()?))
    }
}

/// `[listener]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    /// Names from [`PERSON_VARIABLES`] subscribed for every person.
    #[serde(default = "default_variables")]
    pub variables: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            variables: default_variables(),
        }
    }
}

impl ListenerConfig {
    /// Builds the default listener.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] for an unknown variable name.
    pub fn listener(&self) -> ControlResult<DefaultListener> {
        let variables = self
            .variables
            .iter()
            .map(|name| {
                PERSON_VARIABLES
                    .iter()
                    .find(|(known, _)| *known == name.as_str())
                    .map(|(known, id)| ((*known).to_owned(), *id))
                    .ok_or_else(|| ControlError::Config(format!("unknown person variable '{name}'")))
            })
            .collect::<ControlResult<Vec<_>>>()?;
        Ok(DefaultListener::new(variables))
    }
}

/// `[supervisor]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Simulator command line, program first.
    pub command: Vec<String>,
    /// File receiving the simulator output.
    #[serde(default)]
    pub log: Option<PathBuf>,
    /// Wait after starting the simulator before connecting.
    #[serde(default)]
    pub startup_delay_ms: u64,
}

/// `[controller]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleConfig {
    /// Target lists applied in turn, one per call.
    #[serde(default)]
    pub targets: Vec<Vec<String>>,
    /// Seconds between calls. The stepper decides if absent.
    #[serde(default)]
    pub interval: Option<f64>,
    /// File receiving one row per call.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl CycleConfig {
    /// Builds the controller, creating the output file if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] if the output file cannot be created.
    pub fn controller(&self) -> ControlResult<TargetCycleController> {
        let mut controller = TargetCycleController::new(self.targets.clone());
        if let Some(interval) = self.interval {
            controller = controller.with_interval(interval);
        }
        if let Some(path) = &self.output {
            let columns = CYCLE_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
            controller = controller.with_sink(Box::new(DelimitedWriter::create(path, columns)?));
        }
        Ok(controller)
    }
}

/// Complete configuration of a run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlConfig {
    /// `[connection]`
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// `[scenario]`
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// `[stepping]`
    #[serde(default)]
    pub stepping: SteppingConfig,
    /// `[listener]`
    #[serde(default)]
    pub listener: ListenerConfig,
    /// `[supervisor]`
    #[serde(default)]
    pub supervisor: Option<SupervisorConfig>,
    /// `[controller]`
    #[serde(default)]
    pub controller: CycleConfig,
}

impl ControlConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] on syntax errors, unknown keys or
    /// invalid values.
    pub fn from_toml_str(content: &str) -> ControlResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ControlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] if the file cannot be read and
    /// [`ControlError::Config`] if it is invalid.
    pub fn load(path: impl AsRef<Path>) -> ControlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), role = ?config.connection.role, "configuration loaded");
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] describing the first violation.
    pub fn validate(&self) -> ControlResult<()> {
        if self.connection.host.is_empty() {
            return Err(ControlError::Config("connection.host is empty".into()));
        }
        if self.connection.read_timeout_ms == Some(0) {
            return Err(ControlError::Config("connection.read_timeout_ms must be > 0".into()));
        }
        if self.connection.role == RoleKind::Server && self.scenario.path.is_some() {
            return Err(ControlError::Config(
                "scenario.path is only supported in the client role".into(),
            ));
        }
        if let Some(supervisor) = &self.supervisor {
            if supervisor.command.is_empty() {
                return Err(ControlError::Config("supervisor.command is empty".into()));
            }
        }
        if let Some(interval) = self.controller.interval {
            if !(interval > 0.0 && interval.is_finite()) {
                return Err(ControlError::Config(format!("controller.interval {interval} must be > 0")));
            }
        }
        self.stepping
            .stepper()
            .map_err(|e| ControlError::Config(format!("stepping: {e}")))?;
        self.listener.listener()?;
        Ok(())
    }
}
