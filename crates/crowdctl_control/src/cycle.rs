//! # Target Cycling Controller
//!
//! Rotates every person through a fixed sequence of target lists and
//! records what it did.
//!
//! ```text
//! call 0: every person -> targets[0]
//! call 1: every person -> targets[1]
//! ...
//! call n: every person -> targets[n % len]
//! ```

use crate::collab::ResultSink;
use crate::controller::{Controller, StepContext};
use crate::error::ControlResult;

/// Columns written per call.
pub const CYCLE_COLUMNS: [&str; 3] = ["simTime", "targets", "pedestrians"];

/// Cycles person target lists at scheduled times.
pub struct TargetCycleController {
    targets: Vec<Vec<String>>,
    interval: Option<f64>,
    sink: Option<Box<dyn ResultSink + Send>>,
    calls: u64,
}

impl TargetCycleController {
    /// Creates a controller cycling through `targets`. An empty sequence
    /// only logs membership.
    #[must_use]
    pub fn new(targets: Vec<Vec<String>>) -> Self {
        Self {
            targets,
            interval: None,
            sink: None,
            calls: 0,
        }
    }

    /// Requests a call every `interval` seconds instead of following the
    /// stepper.
    #[must_use]
    pub fn with_interval(mut self, interval: f64) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Records every call in `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn ResultSink + Send>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Number of step callbacks handled.
    #[inline]
    #[must_use]
    pub const fn calls(&self) -> u64 {
        self.calls
    }

    fn schedule(&self, ctx: &mut StepContext<'_>) -> ControlResult<()> {
        match self.interval {
            Some(interval) => ctx.next_call_in(interval),
            None => Ok(()),
        }
    }
}

impl Controller for TargetCycleController {
    fn handle_init(&mut self, ctx: &mut StepContext<'_>) -> ControlResult<()> {
        let persons = ctx.default_listener().pedestrian_ids().len();
        tracing::info!(time = ctx.time(), persons, cycle = self.targets.len(), "controller initialized");
        self.schedule(ctx)
    }

    fn handle_sim_step(&mut self, ctx: &mut StepContext<'_>) -> ControlResult<()> {
        let listener = ctx.default_listener();
        let persons = listener.pedestrian_ids().to_vec();
        tracing::info!(
            time = ctx.time(),
            persons = persons.len(),
            entered = ?listener.new_pedestrian_ids(),
            left = ?listener.removed_pedestrian_ids(),
            "membership"
        );

        let call = self.calls;
        self.calls += 1;

        let targets = if self.targets.is_empty() {
            Vec::new()
        } else {
            let targets = self.targets[(call as usize) % self.targets.len()].clone();
            for person in &persons {
                ctx.persons().set_target_list(person, &targets)?;
            }
            tracing::debug!(?targets, persons = persons.len(), "targets applied");
            targets
        };

        if let Some(sink) = self.sink.as_mut() {
            let row = [ctx.time().to_string(), targets.join(","), persons.len().to_string()];
            sink.append(call, &row)?;
        }
        self.schedule(ctx)
    }

    fn cleanup(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.finish() {
                tracing::warn!(error = %e, "result sink not flushed");
            }
        }
        tracing::info!(calls = self.calls, "controller stopped");
    }
}

impl std::fmt::Debug for TargetCycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetCycleController")
            .field("targets", &self.targets)
            .field("interval", &self.interval)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::channel::Channel;
    use crate::collab::DelimitedWriter;
    use crate::connection::{ClientRole, Connection};
    use crate::stepper::{FixedTimeStepper, Scheduler};
    use crate::test_support::{ack, result_block, status_frame, variable_result, ScriptedStream};
    use crate::transport::FrameTransport;
    use crowdctl_wire::constants::{
        CMD_CLOSE, CMD_SET_PERSON_VARIABLE, CMD_SIMSTEP, CMD_SUBSCRIBE_PERSON_VARIABLE,
        CMD_SUBSCRIBE_SIM_VARIABLE, RESPONSE_SUBSCRIBE_PERSON_VARIABLE,
        RESPONSE_SUBSCRIBE_SIM_VARIABLE, VAR_ID_LIST, VAR_TARGET_LIST, VAR_TIME,
    };
    use crowdctl_wire::{Status, TypedValue};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sim_time(time: f64) -> Vec<u8> {
        variable_result(RESPONSE_SUBSCRIBE_SIM_VARIABLE, "", &[(VAR_TIME, TypedValue::Double(time))])
    }

    fn persons(ids: &[&str]) -> Vec<u8> {
        let ids = ids.iter().map(|s| (*s).to_owned()).collect();
        variable_result(RESPONSE_SUBSCRIBE_PERSON_VARIABLE, "", &[(VAR_ID_LIST, TypedValue::StringList(ids))])
    }

    fn member(id: &str) -> Vec<u8> {
        variable_result(
            RESPONSE_SUBSCRIBE_PERSON_VARIABLE,
            id,
            &[(VAR_TARGET_LIST, TypedValue::StringList(vec!["1".into()]))],
        )
    }

    #[test]
    fn test_targets_cycle_per_call() {
        let script = vec![
            status_frame(&[Status::ok(CMD_SUBSCRIBE_SIM_VARIABLE)], &sim_time(0.0)),
            status_frame(&[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)], &persons(&["7"])),
            status_frame(&[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)], &member("7")),
            status_frame(&[Status::ok(CMD_SIMSTEP)], &result_block(&[sim_time(5.0), persons(&["7"]), member("7")])),
            ack(CMD_SET_PERSON_VARIABLE),
            status_frame(&[Status::ok(CMD_SIMSTEP)], &result_block(&[sim_time(10.0), persons(&["7"]), member("7")])),
            ack(CMD_SET_PERSON_VARIABLE),
            ack(CMD_CLOSE),
        ];
        let (stream, sent) = ScriptedStream::new(script);
        let scheduler = Scheduler::new(Box::new(FixedTimeStepper::new(5.2, 0.0, Some(12.0)).unwrap()));
        let mut connection = Connection::client(ClientRole::new(), Channel::new(FrameTransport::new(stream)), scheduler);

        let buffer = SharedBuffer::default();
        let columns = CYCLE_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
        let mut controller = TargetCycleController::new(vec![vec!["2".into()], vec!["3".into()]])
            .with_interval(5.0)
            .with_sink(Box::new(DelimitedWriter::new(buffer.clone(), columns)));

        connection.start(&mut controller).unwrap();

        assert_eq!(controller.calls(), 2);
        let rows = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(rows, "timeStep simTime targets pedestrians\n0 5 2 1\n1 10 3 1\n");

        // both target lists went out as set commands
        let written = sent.lock().clone();
        let sets = written.windows(2).filter(|w| w == &[CMD_SET_PERSON_VARIABLE, VAR_TARGET_LIST]).count();
        assert_eq!(sets, 2);
    }

    #[test]
    fn test_empty_cycle_only_observes() {
        let mut controller = TargetCycleController::new(Vec::new());
        assert_eq!(controller.calls(), 0);
        controller.cleanup();
        assert!(format!("{controller:?}").contains("TargetCycleController"));
    }
}
