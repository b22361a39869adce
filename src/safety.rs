//! Reservation & arbitration layer.
//!
//! Runs **every tick after** the shutter state machines and the simple
//! rules have populated their layers, and derives `output`:
//!
//! 1. `output = simple_layer`.
//! 2. Enabled shutters overwrite their two relays from `shutter_layer`.
//! 3. Non-reserved relays with a forced override take the forced level.
//! 4. Interlock check: any enabled shutter with both relays on gets both
//!    forced off.
//!
//! Step 4 duplicates the guard inside the shutter state machine.  Both are
//! kept so a composition bug upstream can never energise a motor in both
//! directions.

use log::error;

use crate::io::{OverrideMode, RelayVector};
use crate::shutter::Shutter;

/// Derive `relays.output` from the layers, overrides and shutters.
///
/// Returns the number of interlock violations corrected in step 4; zero on
/// every healthy tick.
pub fn arbitrate(relays: &mut RelayVector, overrides: &[OverrideMode], shutters: &[Shutter]) -> usize {
    let RelayVector {
        simple_layer,
        shutter_layer,
        output,
        reserved,
    } = relays;

    output.clone_from(simple_layer);

    for shutter in shutters.iter().filter(|s| s.is_enabled()) {
        let cfg = shutter.config();
        for idx in [cfg.up_idx(), cfg.down_idx()] {
            if let (Some(out), Some(level)) = (output.get_mut(idx), shutter_layer.get(idx)) {
                *out = *level;
            }
        }
    }

    for (idx, (out, mode)) in output.iter_mut().zip(overrides).enumerate() {
        if reserved.contains(idx) {
            continue;
        }
        if let Some(level) = mode.forced_level() {
            *out = level;
        }
    }

    let mut violations = 0;
    for shutter in shutters.iter().filter(|s| s.is_enabled()) {
        let cfg = shutter.config();
        let (up, down) = (cfg.up_idx(), cfg.down_idx());
        let both_on = output.get(up).copied().unwrap_or(false) && output.get(down).copied().unwrap_or(false);
        if both_on {
            error!(
                "Interlock: shutter '{}' relays {} and {} both on, forcing off",
                cfg.name, cfg.up_relay, cfg.down_relay
            );
            output[up] = false;
            output[down] = false;
            violations += 1;
        }
    }
    violations
}
