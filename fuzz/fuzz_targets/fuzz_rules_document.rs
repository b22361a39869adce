//! Fuzz target: rules document parsing and validation
//!
//! Feeds arbitrary text to `RulesDocument::from_json`, normalises whatever
//! parses to an 8-relay board and validates it.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every accepted shutter has two distinct, in-range relays
//! - Enabled shutters never share a relay
//! - The normalised form of an accepted set validates to the same set
//!
//! cargo fuzz run fuzz_rules_document

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaybox::config::RulesDocument;
use relaybox::config::validate::validate;

const RELAYS: usize = 8;
const INPUTS: usize = 8;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(mut doc) = RulesDocument::from_json(text) else {
        return;
    };
    doc.normalize(RELAYS, INPUTS);

    let Ok(set) = validate(&doc, RELAYS, INPUTS) else {
        return;
    };

    let mut claimed = [false; RELAYS];
    for s in &set.shutters {
        assert!(s.up_idx() < RELAYS && s.down_idx() < RELAYS);
        assert_ne!(s.up_relay, s.down_relay);
    }
    for (up, down) in set.reserved_pairs() {
        for idx in [up, down] {
            assert!(!claimed[idx], "relay {} claimed twice", idx + 1);
            claimed[idx] = true;
        }
    }

    let again = validate(&set.to_document(), RELAYS, INPUTS).expect("normalised document must validate");
    assert_eq!(again, set);
});
