//! Control dispatch: payload → module by `(type, name)` → error documents.

use futures_lite::future::block_on;
use growunit::app::service::ControlOutcome;
use growunit::transport::{Message, MessageQueues};

use crate::mock_hw::{Rig, drain, errors, ready_link, relay, statuses, unit};

const GROWLIGHT_ON: &str = r#"[{"type":"relay","name":"growlight","value":true}]"#;

#[test]
fn matched_valid_command_switches_relay_without_errors() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    let outcome = block_on(unit.handle_control(GROWLIGHT_ON));

    assert_eq!(
        outcome,
        ControlOutcome {
            applied: 1,
            rejected: 0,
            unmatched: 0
        }
    );
    assert_eq!(rig.pin.last(), Some(true));
    assert!(drain(&queues).is_empty(), "no error document expected");
}

#[test]
fn control_message_is_followed_by_status_showing_new_state() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    block_on(unit.process_message(Message::new("growunit/control", GROWLIGHT_ON).unwrap()));

    let sent = drain(&queues);
    assert!(errors(&sent).is_empty());
    let status = statuses(&sent);
    assert_eq!(status.len(), 1);
    assert_eq!(status[0]["modules"][1]["name"], "growlight");
    assert_eq!(status[0]["modules"][1]["state"], true);
}

#[test]
fn unmatched_command_reports_whole_payload_once() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());
    let body = r#"[{"type":"relay","name":"nonexistent","value":true}]"#;

    let outcome = block_on(unit.handle_control(body));

    assert_eq!(outcome.unmatched, 1);
    assert_eq!(
        errors(&drain(&queues)),
        vec![format!("Error! Unrecognized module: {body}")]
    );
    // Only the power-on write; nothing was switched.
    assert_eq!(*rig.pin.levels.borrow(), vec![false]);
}

#[test]
fn several_unmatched_commands_still_report_once() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    block_on(unit.handle_control(
        r#"[{"type":"relay","name":"a","value":1},{"type":"pump","name":"growlight","value":1},{"type":"ds18b20","name":"b","value":0}]"#,
    ));

    assert_eq!(errors(&drain(&queues)).len(), 1);
}

#[test]
fn invalid_plus_unmatched_yields_two_errors() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    let outcome = block_on(unit.handle_control(
        r#"[{"type":"relay","name":"growlight","value":"bright"},{"type":"relay","name":"fan","value":true}]"#,
    ));

    assert_eq!(outcome.rejected, 1);
    assert_eq!(outcome.unmatched, 1);
    let errs = errors(&drain(&queues));
    assert_eq!(errs.len(), 2);
    assert_eq!(
        errs[0],
        "Error! Invalid value in control payload for relay/growlight: \"bright\" (expected boolean)"
    );
    assert!(errs[1].starts_with("Error! Unrecognized module: "));
}

#[test]
fn sensor_is_not_a_control_target() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    let outcome = block_on(unit.handle_control(
        r#"[{"type":"ds18b20","name":"waterTemperatureCelsius","value":true}]"#,
    ));

    assert_eq!(outcome.unmatched, 1);
    assert_eq!(errors(&drain(&queues)).len(), 1);
}

#[test]
fn malformed_payload_processes_nothing() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    let outcome = block_on(unit.handle_control("relay=on"));

    assert_eq!(outcome, ControlOutcome::default());
    assert_eq!(
        errors(&drain(&queues)),
        vec!["Error! Invalid payload: relay=on".to_owned()]
    );
    assert_eq!(rig.pin.writes(), 1);
}

#[test]
fn null_payload_is_a_parse_error() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    block_on(unit.handle_control("null"));

    assert_eq!(
        errors(&drain(&queues)),
        vec!["Error parsing payload!".to_owned()]
    );
}

#[test]
fn command_without_value_is_rejected_by_relay() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    let outcome = block_on(unit.handle_control(r#"[{"type":"relay","name":"growlight"}]"#));

    assert_eq!(outcome.rejected, 1);
    assert!(errors(&drain(&queues))[0].contains("relay/growlight: null"));
}

#[test]
fn relay_driver_fault_is_reported() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());
    *rig.pin.broken.borrow_mut() = true;

    let outcome = block_on(unit.handle_control(GROWLIGHT_ON));

    assert_eq!(outcome.rejected, 1);
    assert!(errors(&drain(&queues))[0].ends_with("(driver failed)"));
}

#[test]
fn commands_apply_in_order() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    let unit = unit(&queues, ready_link(), rig.modules());

    block_on(unit.handle_control(
        r#"[{"type":"relay","name":"growlight","value":true},{"type":"relay","name":"growlight","value":0}]"#,
    ));

    assert_eq!(*rig.pin.levels.borrow(), vec![false, true, false]);
}

#[test]
fn relay_state_persists_across_units() {
    let rig = Rig::new();
    let queues = MessageQueues::new();
    {
        let unit = unit(&queues, ready_link(), rig.modules());
        block_on(unit.handle_control(GROWLIGHT_ON));
    }

    let pin = crate::mock_hw::RecordingPin::default();
    let restored = relay("growlight", &pin, &rig.storage);
    assert!(restored.is_on());
    assert_eq!(pin.last(), Some(true));
}
