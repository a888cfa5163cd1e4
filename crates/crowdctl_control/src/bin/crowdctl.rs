//! # crowdctl
//!
//! ```text
//! crowdctl <config.toml>
//! ```
//!
//! Loads the configuration, optionally starts the simulator, then runs a
//! [`TargetCycleController`] in the configured role until the simulation
//! ends. The simulator is stopped before exit.

use std::net::TcpListener;
use std::process::ExitCode;
use std::time::Duration;

use crowdctl_control::config::SupervisorConfig;
use crowdctl_control::{
    ClientRole, CommandSupervisor, Connection, ControlConfig, ControlResult, FileScenario,
    Listeners, ProcessSupervisor, RoleKind, ScenarioSource, TargetCycleController,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn run(config: &ControlConfig) -> ControlResult<()> {
    let scheduler = config.stepping.scheduler()?;
    let listeners = Listeners::new(config.listener.listener()?);
    let mut controller: TargetCycleController = config.controller.controller()?;
    let address = config.connection.address();
    let timeout = config.connection.read_timeout();

    match config.connection.role {
        RoleKind::Client => {
            let mut role = ClientRole::new();
            if let Some(path) = &config.scenario.path {
                role = role.with_scenario(FileScenario.load(path)?);
            }
            tracing::info!(%address, "connecting to simulation");
            let mut connection =
                Connection::connect(address.as_str(), timeout, role, scheduler)?.with_listeners(listeners);
            connection.start(&mut controller)
        }
        RoleKind::Server => {
            let listener = TcpListener::bind(address.as_str())?;
            tracing::info!(%address, "waiting for orchestrator");
            let mut connection = Connection::accept(&listener, timeout, scheduler)?.with_listeners(listeners);
            connection.start(&mut controller)
        }
    }
}

fn start_simulator(
    supervisor: &mut CommandSupervisor,
    config: &SupervisorConfig,
) -> ControlResult<crowdctl_control::ProcessHandle> {
    let handle = supervisor.start(&config.command)?;
    if config.startup_delay_ms > 0 {
        std::thread::sleep(Duration::from_millis(config.startup_delay_ms));
    }
    Ok(handle)
}

fn main() -> ExitCode {
    init_tracing();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: crowdctl <config.toml>");
        return ExitCode::from(2);
    };
    let config = match ControlConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    // 1. Simulator
    let mut supervisor = CommandSupervisor::new();
    let mut simulator = None;
    if let Some(sup) = &config.supervisor {
        if let Some(log) = &sup.log {
            supervisor = supervisor.with_log(log);
        }
        match start_simulator(&mut supervisor, sup) {
            Ok(handle) => simulator = Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "simulator did not start");
                return ExitCode::FAILURE;
            }
        }
    }

    // 2. Control loop
    let result = run(&config);

    // 3. Simulator is stopped on every path
    if let Some(handle) = simulator {
        if let Err(e) = supervisor.stop(handle) {
            tracing::warn!(error = %e, "simulator did not stop cleanly");
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
