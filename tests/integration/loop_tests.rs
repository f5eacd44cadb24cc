//! Both service loops driven together on a local executor.

use std::time::{Duration, Instant};

use edge_executor::LocalExecutor;
use futures_lite::future::block_on;
use growunit::connectivity::ConnectivityState;
use growunit::transport::{Message, MessageQueues};
use serde_json::Value;

use crate::mock_hw::{Rig, ready_link, unit};

fn parse(message: &Message) -> Value {
    serde_json::from_str(&message.body).unwrap()
}

#[test]
fn status_loop_reports_at_startup_and_control_triggers_another() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    let executor: LocalExecutor<'_, 8> = LocalExecutor::new();
    executor.spawn(unit.run()).detach();

    let (first, second) = block_on(executor.run(async {
        let first = queues.outgoing.receive().await;
        queues.push_incoming(
            Message::new(
                "growunit/control",
                r#"[{"type":"relay","name":"growlight","value":true}]"#,
            )
            .unwrap(),
        );
        let second = queues.outgoing.receive().await;
        (first, second)
    }));

    assert_eq!(first.topic, "growunit/status");
    assert_eq!(parse(&first)["modules"][1]["state"], false);
    assert_eq!(second.topic, "growunit/status");
    assert_eq!(parse(&second)["modules"][1]["state"], true);
    assert_eq!(parse(&second)["modules"][0]["reading"], 21.5);
}

/// While the unit busy-polls for readiness its task is always runnable, so
/// `LocalExecutor::run` would never get back to the caller's future.  The
/// executor is stepped by hand instead.
#[test]
fn loops_hold_traffic_until_connectivity_is_ready() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let link = ConnectivityState::new();
    let unit = unit(&queues, link.clone(), rig.modules());

    let executor: LocalExecutor<'_, 8> = LocalExecutor::new();
    executor.spawn(unit.run()).detach();

    queues.push_incoming(Message::new("growunit/status-request", "").unwrap());
    for _ in 0..100 {
        executor.try_tick();
    }
    assert!(queues.try_take_outgoing().is_none());
    assert_eq!(rig.bus.state().scans, 0);

    link.set_network_up(true);
    link.set_session_up(true);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut sent = Vec::new();
    while sent.len() < 2 {
        assert!(Instant::now() < deadline, "only {} message(s) sent", sent.len());
        executor.try_tick();
        sent.extend(queues.try_take_outgoing());
    }

    assert!(sent.iter().all(|m| m.topic == "growunit/status"));
}

#[test]
fn inbound_messages_are_handled_in_arrival_order() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    let executor: LocalExecutor<'_, 8> = LocalExecutor::new();
    executor.spawn(unit.run()).detach();

    let errors = block_on(executor.run(async {
        // Startup status.
        queues.outgoing.receive().await;
        for topic in ["unit/a", "unit/b", "unit/c"] {
            queues.push_incoming(Message::new(topic, "").unwrap());
        }
        let mut errors = Vec::new();
        for _ in 0..3 {
            let message = queues.outgoing.receive().await;
            errors.push(parse(&message)["error"].as_str().unwrap().to_owned());
        }
        errors
    }));

    assert_eq!(
        errors,
        vec![
            "Error! Unrecognized topic: unit/a",
            "Error! Unrecognized topic: unit/b",
            "Error! Unrecognized topic: unit/c",
        ]
    );
}
