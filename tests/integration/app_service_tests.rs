//! Integration tests for the AppService → Engine → relay pipeline.
//!
//! Drive the service end to end through mock ports: boot-time loading,
//! the command surface, the command channel, and emitted events.

use super::mock_hw::{MockClock, MockHardware, MockStore, RecordingSink};

use relaybox::app::channel::{CommandChannel, REPLY_DEPTH, ReplyChannel, ReplyMsg, submit};
use relaybox::app::commands::AppCommand;
use relaybox::app::ports::RulesStore;
use relaybox::app::events::AppEvent;
use relaybox::app::service::AppService;
use relaybox::config::{ControllerConfig, RulesDocument, ShutterEntry};
use relaybox::engine::LoadOutcome;
use relaybox::error::{ConfigValidationError, Error, StoreError};
use relaybox::io::OverrideMode;
use relaybox::shutter::{ManualCommand, ShutterMove};

fn shutter_doc() -> RulesDocument {
    let mut doc = RulesDocument::default_for(4, 4);
    doc.shutters.push(ShutterEntry::default_for(0));
    doc
}

fn booted(store: &mut MockStore) -> (AppService, MockHardware, MockClock, RecordingSink) {
    let mut app = AppService::new(ControllerConfig::default(), 4, 4);
    let mut sink = RecordingSink::default();
    app.boot(store, &mut sink);
    (app, MockHardware::new(4), MockClock::default(), sink)
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_with_stored_shutter_reserves_relays() {
    let mut store = MockStore::with(shutter_doc());
    let (app, _, _, sink) = booted(&mut store);
    assert!(app.engine().relays().reserved.contains(0));
    assert!(app.engine().relays().reserved.contains(1));
    assert!(matches!(
        sink.events.first(),
        Some(AppEvent::Started {
            outcome: LoadOutcome::Loaded,
            ..
        })
    ));
    assert!(store.saves.is_empty());
}

#[test]
fn boot_with_corrupted_store_falls_back_to_defaults() {
    let mut store = MockStore::corrupted();
    let (mut app, mut hw, clock, mut sink) = booted(&mut store);
    hw.inputs = vec![true, false, false, true];
    app.tick(&mut hw, &clock, &mut sink);
    assert_eq!(hw.last_write(), &[true, false, false, true]);
    assert!(app.engine().shutters().is_empty());
}

#[test]
fn boot_writes_defaults_back_when_nothing_usable_is_stored() {
    for mut store in [MockStore::default(), MockStore::corrupted()] {
        let mut app = AppService::new(ControllerConfig::default(), 4, 4);
        let outcome = app.boot(&mut store, &mut RecordingSink::default());
        assert_eq!(outcome, LoadOutcome::Defaulted);
        assert_eq!(store.saves, vec![app.engine().document()]);
        assert_eq!(store.saves[0].relays.len(), 4);
        assert!(store.saves[0].shutters.is_empty());
        assert_eq!(store.load(), Ok(app.engine().document()));
    }
}

#[test]
fn boot_survives_failed_default_write_back() {
    let mut store = MockStore {
        fail_save: Some(StoreError::Full),
        ..MockStore::default()
    };
    let mut app = AppService::new(ControllerConfig::default(), 4, 4);
    assert_eq!(app.boot(&mut store, &mut RecordingSink::default()), LoadOutcome::Defaulted);
    assert!(store.saves.is_empty());
    assert_eq!(app.engine().document().relays.len(), 4);
}

#[test]
fn boot_with_short_document_writes_back_normalized() {
    let mut store = MockStore::with(RulesDocument::default_for(2, 4));
    let mut app = AppService::new(ControllerConfig::default(), 4, 8);
    let outcome = app.boot(&mut store, &mut RecordingSink::default());
    assert_eq!(outcome, LoadOutcome::Normalized);
    assert_eq!(store.saves.len(), 1);
    assert_eq!(store.saves[0].relays.len(), 8);
}

#[test]
fn boot_with_conflicting_shutters_disables_them() {
    let mut doc = shutter_doc();
    let mut second = ShutterEntry::default_for(1);
    second.up_relay = Some(2);
    doc.shutters.push(second);
    let mut store = MockStore::with(doc);

    let (mut app, _, _, _) = booted(&mut store);
    assert!(app.engine().shutters().is_empty());
    assert_eq!(app.engine().relays().reserved.count(), 0);

    let mut sink = RecordingSink::default();
    let result = app.handle_command(
        AppCommand::SetOverride {
            relay: 1,
            mode: OverrideMode::ForceOn,
        },
        &mut store,
        &mut sink,
    );
    assert!(result.is_ok(), "relays are no longer reserved");
}

// ── Command surface ───────────────────────────────────────────

#[test]
fn override_reserved_relay_is_rejected() {
    let mut store = MockStore::with(shutter_doc());
    let (mut app, mut hw, clock, mut sink) = booted(&mut store);

    let err = app
        .handle_command(
            AppCommand::SetOverride {
                relay: 2,
                mode: OverrideMode::ForceOn,
            },
            &mut store,
            &mut sink,
        )
        .unwrap_err();
    assert_eq!(err, Error::ReservedRelay { relay: 2 });
    assert_eq!(err.to_string(), "relay reserved by shutter");

    app.tick(&mut hw, &clock, &mut sink);
    assert!(!hw.relay(2));
    assert_eq!(app.engine().override_mode(2), Some(OverrideMode::Auto));
}

#[test]
fn override_forces_free_relay() {
    let mut store = MockStore::default();
    let (mut app, mut hw, clock, mut sink) = booted(&mut store);
    hw.set_input(3, true);

    let cmd = AppCommand::relay_payload(3, "OFF").unwrap();
    app.handle_command(cmd, &mut store, &mut sink).unwrap();
    app.tick(&mut hw, &clock, &mut sink);
    assert!(!hw.relay(3));

    app.handle_command(AppCommand::ToggleOverride { relay: 3 }, &mut store, &mut sink)
        .unwrap();
    app.tick(&mut hw, &clock, &mut sink);
    assert!(hw.relay(3));

    let cmd = AppCommand::relay_payload(3, "AUTO").unwrap();
    app.handle_command(cmd, &mut store, &mut sink).unwrap();
    hw.set_input(3, false);
    app.tick(&mut hw, &clock, &mut sink);
    assert!(!hw.relay(3));
}

#[test]
fn manual_shutter_command_moves_and_emits_event() {
    let mut store = MockStore::with(shutter_doc());
    let (mut app, mut hw, clock, mut sink) = booted(&mut store);

    let cmd = AppCommand::shutter_payload(1, "CLOSE").unwrap();
    app.handle_command(cmd, &mut store, &mut sink).unwrap();
    app.tick(&mut hw, &clock, &mut sink);

    assert!(!hw.relay(1));
    assert!(hw.relay(2));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ShutterMoved {
            shutter: 1,
            from: ShutterMove::Stop,
            to: ShutterMove::Down
        }
    )));
}

#[test]
fn manual_command_on_unconfigured_shutter_is_rejected() {
    let mut store = MockStore::default();
    let (mut app, _, _, mut sink) = booted(&mut store);
    let err = app
        .handle_command(
            AppCommand::SetManual {
                shutter: 1,
                cmd: ManualCommand::Up,
            },
            &mut store,
            &mut sink,
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "no shutter configured");
}

#[test]
fn replace_rules_persists_then_applies() {
    let mut store = MockStore::default();
    let (mut app, mut hw, clock, mut sink) = booted(&mut store);

    app.handle_command(AppCommand::ReplaceRules(shutter_doc()), &mut store, &mut sink)
        .unwrap();
    // Boot already wrote the defaults.
    assert_eq!(store.saves.len(), 2);
    assert_eq!(store.saves.last(), Some(&app.engine().document()));
    assert!(sink.events.iter().any(|e| matches!(e, AppEvent::RulesReplaced)));

    // Input 1 is now the shutter's up button.
    hw.set_input(1, true);
    app.tick(&mut hw, &clock, &mut sink);
    assert_eq!(app.engine().shutters()[0].motion(), ShutterMove::Up);
}

#[test]
fn replace_rules_rejection_is_verbatim_and_not_persisted() {
    let mut store = MockStore::with(shutter_doc());
    let (mut app, _, _, mut sink) = booted(&mut store);
    let before = app.engine().document();

    let mut doc = shutter_doc();
    doc.shutters[0].up_relay = Some(2);
    doc.shutters[0].down_relay = Some(2);
    let err = app
        .handle_command(AppCommand::ReplaceRules(doc), &mut store, &mut sink)
        .unwrap_err();
    assert_eq!(err, Error::Validation(ConfigValidationError::SameRelay { shutter: 1 }));
    assert_eq!(err.to_string(), "shutter 1: up_relay and down_relay must be different");
    assert!(store.saves.is_empty());
    assert_eq!(app.engine().document(), before);
}

#[test]
fn replace_rules_store_failure_keeps_live_config() {
    let mut store = MockStore::default();
    let (mut app, _, _, mut sink) = booted(&mut store);
    store.fail_save = Some(StoreError::IoError);

    let err = app
        .handle_command(AppCommand::ReplaceRules(shutter_doc()), &mut store, &mut sink)
        .unwrap_err();
    assert_eq!(err, Error::Store(StoreError::IoError));
    assert!(app.engine().shutters().is_empty());
}

// ── Channel & events ──────────────────────────────────────────

#[test]
fn queued_commands_apply_between_ticks() {
    let (commands, replies) = (CommandChannel::new(), ReplyChannel::new());
    let mut store = MockStore::default();
    let (mut app, mut hw, clock, mut sink) = booted(&mut store);

    submit(&commands, 1, AppCommand::relay_payload(1, "ON").unwrap()).unwrap();
    submit(&commands, 2, AppCommand::relay_payload(9, "ON").unwrap()).unwrap();

    assert_eq!(app.drain_commands(&commands, &replies, &mut store, &mut sink), 2);
    app.tick(&mut hw, &clock, &mut sink);
    assert!(hw.relay(1));
    assert_eq!(app.drain_commands(&commands, &replies, &mut store, &mut sink), 0);

    assert_eq!(replies.try_receive().ok(), Some(ReplyMsg { id: 1, result: Ok(()) }));
    assert_eq!(
        replies.try_receive().ok(),
        Some(ReplyMsg {
            id: 2,
            result: Err(Error::RelayOutOfRange { relay: 9 })
        })
    );
}

#[test]
fn queued_rejections_reach_the_caller_verbatim() {
    let (commands, replies) = (CommandChannel::new(), ReplyChannel::new());
    let mut store = MockStore::with(shutter_doc());
    let (mut app, _, _, mut sink) = booted(&mut store);
    let before = app.engine().document();

    let mut bad = shutter_doc();
    bad.shutters[0].up_relay = Some(2);
    bad.shutters[0].down_relay = Some(2);
    submit(&commands, 7, AppCommand::ReplaceRules(bad)).unwrap();
    submit(&commands, 8, AppCommand::relay_payload(1, "ON").unwrap()).unwrap();
    app.drain_commands(&commands, &replies, &mut store, &mut sink);

    let reply = replies.try_receive().unwrap();
    assert_eq!(reply.id, 7);
    assert_eq!(
        reply.result.unwrap_err().to_string(),
        "shutter 1: up_relay and down_relay must be different"
    );
    let reply = replies.try_receive().unwrap();
    assert_eq!(reply.id, 8);
    assert_eq!(reply.result, Err(Error::ReservedRelay { relay: 1 }));
    assert_eq!(app.engine().document(), before);
}

#[test]
fn full_reply_queue_does_not_stall_commands() {
    let (commands, replies) = (CommandChannel::new(), ReplyChannel::new());
    let mut store = MockStore::default();
    let (mut app, _, _, mut sink) = booted(&mut store);

    // Five rounds of four toggles overflow the reply queue by four.
    for round in 0..5u32 {
        for relay in 1..=4 {
            submit(&commands, round * 10 + relay as u32, AppCommand::ToggleOverride { relay }).unwrap();
        }
        assert_eq!(app.drain_commands(&commands, &replies, &mut store, &mut sink), 4);
    }
    assert_eq!(app.engine().override_mode(1), Some(OverrideMode::ForceOn));
    assert_eq!(replies.try_receive().map(|r| r.id).ok(), Some(1));
    let mut rest = 0;
    while replies.try_receive().is_ok() {
        rest += 1;
    }
    assert_eq!(rest, REPLY_DEPTH - 1);
}

#[test]
fn relay_changes_and_telemetry_are_emitted() {
    let mut store = MockStore::default();
    let (mut app, mut hw, clock, mut sink) = booted(&mut store);
    let relays_changed = |e: &AppEvent| matches!(e, AppEvent::RelaysChanged(_));
    let telemetry = |e: &AppEvent| matches!(e, AppEvent::Telemetry(_));

    app.tick(&mut hw, &clock, &mut sink);
    assert_eq!(sink.count(relays_changed), 0, "all-off at boot is no change");
    assert_eq!(sink.count(telemetry), 1);

    hw.set_input(2, true);
    clock.advance(10);
    app.tick(&mut hw, &clock, &mut sink);
    assert_eq!(sink.count(relays_changed), 1);

    clock.advance(10);
    app.tick(&mut hw, &clock, &mut sink);
    assert_eq!(sink.count(relays_changed), 1, "unchanged outputs emit nothing");
    assert_eq!(sink.count(telemetry), 1);

    clock.set(1000);
    app.tick(&mut hw, &clock, &mut sink);
    assert_eq!(sink.count(telemetry), 2);
    assert_eq!(app.tick_count(), 4);

    let Some(AppEvent::Telemetry(snap)) = sink.events.iter().rev().find(|e| matches!(e, AppEvent::Telemetry(_))) else {
        panic!("telemetry expected");
    };
    assert_eq!(snap.relays, vec![false, true, false, false]);
    assert_eq!(snap.uptime_ms, 1000);
}

#[test]
fn resize_resets_to_defaults() {
    let mut store = MockStore::with(shutter_doc());
    let (mut app, _, clock, mut sink) = booted(&mut store);
    app.resize(8, 8);
    let mut hw = MockHardware::new(8);
    hw.set_input(8, true);
    app.tick(&mut hw, &clock, &mut sink);
    assert_eq!(hw.last_write().len(), 8);
    assert!(hw.relay(8));
    assert!(app.engine().shutters().is_empty());
}
