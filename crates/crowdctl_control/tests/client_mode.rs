//! # Client Mode End-to-End Tests
//!
//! The controller owns the clock: it steps a scripted simulation and
//! checks what reaches the callbacks.

mod common;

use common::{block, frames, ok, person_ids, reply, sim_time, strings, variables, ScriptedPeer};
use crowdctl_control::{
    ClientRole, Connection, ConnectionState, ControlResult, Controller, Domain, FixedTimeStepper,
    Scheduler, StepContext,
};
use crowdctl_wire::constants::{
    CMD_CLOSE, CMD_SET_PERSON_VARIABLE, CMD_SIMSTEP, CMD_SUBSCRIBE_PERSON_VARIABLE, CMD_SUBSCRIBE_SIM_VARIABLE,
    RESPONSE_SUBSCRIBE_PERSON_VARIABLE, SIMULATION_END_MESSAGE, VAR_POSITION,
    VAR_TARGET_LIST,
};
use crowdctl_wire::{ResultCode, Status, TypedValue};

fn person(id: &str, x: f64) -> Vec<u8> {
    variables(
        RESPONSE_SUBSCRIBE_PERSON_VARIABLE,
        id,
        &[
            (VAR_POSITION, TypedValue::Position2D { x, y: 1.0 }),
            (VAR_TARGET_LIST, strings(&["5"])),
        ],
    )
}

#[derive(Default)]
struct Observer {
    seen: Vec<(f64, Vec<(String, f64)>)>,
    cleanups: usize,
}

impl Controller for Observer {
    fn handle_init(&mut self, ctx: &mut StepContext<'_>) -> ControlResult<()> {
        ctx.next_call_at(5.0)
    }

    fn handle_sim_step(&mut self, ctx: &mut StepContext<'_>) -> ControlResult<()> {
        let persons = ctx
            .default_listener()
            .pedestrians()
            .iter()
            .filter_map(|p| {
                let (x, _) = p.get("pos")?.as_position()?;
                Some((p.id.clone(), x))
            })
            .collect();
        self.seen.push((ctx.time(), persons));
        Ok(())
    }

    fn cleanup(&mut self) {
        self.cleanups += 1;
    }
}

fn scheduler(end: f64) -> Scheduler {
    Scheduler::new(Box::new(FixedTimeStepper::new(0.4, 0.0, Some(end)).unwrap()))
}

#[test]
fn test_new_members_subscribed_before_callback() {
    let (channel, sent) = ScriptedPeer::channel(vec![
        // initial subscriptions: simulation globals, then the person list
        reply(&[Status::ok(CMD_SUBSCRIBE_SIM_VARIABLE)], &sim_time(0.0)),
        reply(&[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)], &person_ids(&[])),
        // step to 5.0 reports two new persons
        reply(&[Status::ok(CMD_SIMSTEP)], &block(&[sim_time(5.0), person_ids(&["1", "2"])])),
        reply(&[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)], &person("1", 3.0)),
        reply(&[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)], &person("2", 4.0)),
        ok(CMD_CLOSE),
    ]);
    let mut connection = Connection::client(ClientRole::new(), channel, scheduler(5.2));
    let mut observer = Observer::default();

    connection.start(&mut observer).unwrap();

    assert_eq!(
        observer.seen,
        vec![(5.0, vec![("1".to_owned(), 3.0), ("2".to_owned(), 4.0)])]
    );
    assert_eq!(observer.cleanups, 1);
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert_eq!(
        connection.channel().subscriptions().members(&Domain::PERSON),
        vec!["1", "2"]
    );

    let frames = frames(&sent.lock());
    // sim subscribe, person subscribe, step, two member subscribes, close
    assert_eq!(frames.len(), 6);
    // [len 10][CMD_SIMSTEP][5.0 as a raw f64]
    assert_eq!(frames[2].len(), 10);
    assert_eq!(frames[2][0], 10);
    assert_eq!(frames[2][1], CMD_SIMSTEP);
    assert_eq!(frames[2][2..10], 5.0f64.to_be_bytes());
    assert_eq!(frames[3][1], CMD_SUBSCRIBE_PERSON_VARIABLE);
    assert_eq!(frames[5][1], CMD_CLOSE);
}

#[test]
fn test_simulation_end_is_quiet() {
    let end = Status::new(CMD_SIMSTEP, ResultCode::Error, SIMULATION_END_MESSAGE);
    let (channel, _) = ScriptedPeer::channel(vec![
        reply(&[Status::ok(CMD_SUBSCRIBE_SIM_VARIABLE)], &sim_time(0.0)),
        reply(&[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)], &person_ids(&[])),
        reply(&[end], &[]),
        ok(CMD_CLOSE),
    ]);
    let mut connection = Connection::client(ClientRole::new(), channel, scheduler(100.0));
    let mut observer = Observer::default();

    assert!(connection.start(&mut observer).is_ok());

    assert!(observer.seen.is_empty());
    assert_eq!(observer.cleanups, 1);
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[test]
fn test_rejected_command_keeps_running() {
    struct Pusher;

    impl Controller for Pusher {
        fn handle_init(&mut self, _ctx: &mut StepContext<'_>) -> ControlResult<()> {
            Ok(())
        }

        fn handle_sim_step(&mut self, ctx: &mut StepContext<'_>) -> ControlResult<()> {
            ctx.persons().set_speed("ghost", 1.0)
        }
    }

    let (channel, _) = ScriptedPeer::channel(vec![
        reply(&[Status::ok(CMD_SUBSCRIBE_SIM_VARIABLE)], &sim_time(0.0)),
        reply(&[Status::ok(CMD_SUBSCRIBE_PERSON_VARIABLE)], &person_ids(&[])),
        reply(&[Status::ok(CMD_SIMSTEP)], &block(&[sim_time(0.0), person_ids(&[])])),
        reply(&[Status::new(CMD_SET_PERSON_VARIABLE, ResultCode::Error, "unknown person ghost")], &[]),
        reply(&[Status::ok(CMD_SIMSTEP)], &block(&[sim_time(0.4), person_ids(&[])])),
        reply(&[Status::new(CMD_SET_PERSON_VARIABLE, ResultCode::Error, "unknown person ghost")], &[]),
        ok(CMD_CLOSE),
    ]);
    let mut connection = Connection::client(ClientRole::new(), channel, scheduler(0.8));

    connection.start(&mut Pusher).unwrap();

    assert_eq!(connection.current_time(), Some(0.4));
}
