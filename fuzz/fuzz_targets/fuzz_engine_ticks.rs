//! Fuzz target: `Engine::tick` under arbitrary input streams
//!
//! Every byte pair is one cycle: the first byte is the 8-bit input sample,
//! the second the elapsed time in milliseconds.  A high bit in the time
//! byte injects a manual command instead.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - No shutter ever has both relays on
//!
//! cargo fuzz run fuzz_engine_ticks

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaybox::config::{RulesDocument, ShutterEntry};
use relaybox::engine::Engine;
use relaybox::shutter::ManualCommand;

fuzz_target!(|data: &[u8]| {
    let mut doc = RulesDocument::default_for(8, 8);
    for slot in 0..2 {
        let mut entry = ShutterEntry::default_for(slot);
        entry.up_in = (slot * 2 + 1) as i32;
        entry.down_in = (slot * 2 + 2) as i32;
        entry.mode = if slot == 0 { "hold" } else { "toggle" }.into();
        entry.max_run_ms = 2_000;
        doc.shutters.push(entry);
    }
    let mut engine = Engine::new(8, 8);
    if engine.replace_rules(&doc).is_err() {
        return;
    }

    let mut now = 0u64;
    for pair in data.chunks_exact(2) {
        let (sample, step) = (pair[0], pair[1]);
        if step & 0x80 != 0 {
            let cmd = match sample & 0x03 {
                0 => ManualCommand::Up,
                1 => ManualCommand::Down,
                2 => ManualCommand::Stop,
                _ => ManualCommand::Auto,
            };
            let _ = engine.set_manual(usize::from(sample >> 7) + 1, cmd);
            continue;
        }

        now += u64::from(step) * 10;
        let levels: [bool; 8] = core::array::from_fn(|i| sample & (1 << i) != 0);
        let out = engine.tick(&levels, now).to_vec();
        for shutter in engine.shutters() {
            let cfg = shutter.config();
            assert!(
                !(out[cfg.up_idx()] && out[cfg.down_idx()]),
                "interlock violated for '{}'",
                cfg.name
            );
        }
    }
});
