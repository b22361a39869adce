//! End-to-end engine scenarios: one relay or shutter driven through a
//! timed input sequence, checked against the final relay vector.

use relaybox::config::{RulesDocument, ShutterEntry};
use relaybox::engine::Engine;
use relaybox::rules::RuleSpec;
use relaybox::rules::expr::Expression;
use relaybox::shutter::ShutterMove;

const UP: [bool; 4] = [true, false, false, false];
const DOWN: [bool; 4] = [false, true, false, false];
const IDLE: [bool; 4] = [false; 4];

fn engine_with(doc: &RulesDocument) -> Engine {
    let mut engine = Engine::new(4, 4);
    engine.replace_rules(doc).unwrap();
    engine
}

fn shutter_engine(mode: &str) -> Engine {
    let mut doc = RulesDocument::default_for(4, 4);
    let mut entry = ShutterEntry::default_for(0);
    entry.mode = mode.into();
    doc.shutters.push(entry);
    engine_with(&doc)
}

#[test]
fn pulse_window_is_independent_of_level() {
    let mut doc = RulesDocument::default_for(4, 4);
    doc.relays[0] = RuleSpec {
        expression: Expression::PulseOnRise {
            input: 1,
            duration_ms: 200,
        },
        ..RuleSpec::follow(1)
    };
    let mut engine = engine_with(&doc);

    engine.tick(&IDLE, 0);
    assert!(engine.tick(&UP, 0)[0]);
    assert!(engine.relays().simple_layer[0]);
    assert!(engine.tick(&UP, 150)[0]);
    assert!(!engine.tick(&UP, 250)[0]);
}

#[test]
fn shutter_reversal_waits_out_deadtime() {
    let mut engine = shutter_engine("hold");

    engine.tick(&UP, 0);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Up);

    let out = engine.tick(&DOWN, 0).to_vec();
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Stop);
    assert_eq!(engine.shutters()[0].runtime().cooldown_until_ms, 400);
    assert_eq!(&out[..2], &[false, false]);

    engine.tick(&DOWN, 200);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Stop);
    assert_eq!(&engine.outputs()[..2], &[false, false]);

    engine.tick(&DOWN, 450);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Down);
    assert_eq!(&engine.outputs()[..2], &[false, true]);
}

#[test]
fn invalid_replacement_leaves_shutters_running() {
    let mut engine = shutter_engine("hold");
    engine.tick(&UP, 0);
    let document = engine.document();
    let reserved = engine.relays().reserved.clone();

    let mut doc = engine.document();
    doc.shutters[0].up_relay = Some(2);
    doc.shutters[0].down_relay = Some(2);
    assert!(engine.replace_rules(&doc).is_err());

    assert_eq!(engine.document(), document);
    assert_eq!(engine.relays().reserved, reserved);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Up);
    assert_eq!(&engine.tick(&UP, 10)[..2], &[true, false]);
}

#[test]
fn toggle_double_tap_starts_then_stops() {
    let mut engine = shutter_engine("toggle");

    engine.tick(&UP, 0);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Up);
    engine.tick(&IDLE, 100);
    engine.tick(&IDLE, 500);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Up, "toggle latches");

    engine.tick(&UP, 600);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Stop);
    assert_eq!(&engine.outputs()[..2], &[false, false]);
}

#[test]
fn max_run_stops_a_latched_toggle() {
    let mut doc = RulesDocument::default_for(4, 4);
    let mut entry = ShutterEntry::default_for(0);
    entry.mode = "toggle".into();
    entry.max_run_ms = 1000;
    doc.shutters.push(entry);
    let mut engine = engine_with(&doc);

    engine.tick(&DOWN, 0);
    engine.tick(&IDLE, 999);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Down);
    engine.tick(&IDLE, 1000);
    assert_eq!(engine.shutters()[0].motion(), ShutterMove::Stop);
    assert_eq!(&engine.outputs()[..2], &[false, false]);
}

#[test]
fn off_delay_with_invert() {
    let mut doc = RulesDocument::default_for(4, 4);
    doc.relays[3] = RuleSpec {
        invert: true,
        on_delay_ms: 100,
        ..RuleSpec::follow(4)
    };
    let mut engine = engine_with(&doc);
    let held = [false, false, false, true];

    // Input 4 low → inverted demand high, after the on delay.
    assert!(!engine.tick(&IDLE, 0)[3]);
    assert!(!engine.tick(&IDLE, 99)[3]);
    assert!(engine.tick(&IDLE, 100)[3]);
    // No off delay: drops immediately.
    assert!(!engine.tick(&held, 110)[3]);
}

#[test]
fn xor_and_toggle_rules_share_inputs() {
    let mut doc = RulesDocument::default_for(4, 4);
    doc.relays[2].expression = Expression::Xor { ins: vec![1, 2] };
    doc.relays[3].expression = Expression::ToggleOnRise { input: 1 };
    let mut engine = engine_with(&doc);

    engine.tick(&IDLE, 0);
    let out = engine.tick(&UP, 10).to_vec();
    assert_eq!(&out[2..], &[true, true]);
    let out = engine.tick(&[true, true, false, false], 20).to_vec();
    assert_eq!(&out[2..], &[false, true]);
    engine.tick(&IDLE, 30);
    let out = engine.tick(&UP, 40).to_vec();
    assert_eq!(&out[2..], &[true, false]);
}
