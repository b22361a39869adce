//! On/off delay stage.
//!
//! Turns a raw rule demand into a debounced one.  Each relay has an
//! independent pending transition: arming happens when the demand first
//! differs from the armed target, and a reversal mid-delay re-arms from
//! the reversal point.  While the deadline is in the future the relay
//! keeps its previously emitted level.

use super::RuleMemory;

/// Apply the relay's on/off delays to `desired`.
///
/// `last_output` is the level emitted for this relay on the previous cycle.
pub fn debounce(
    desired: bool,
    on_delay_ms: u32,
    off_delay_ms: u32,
    memory: &mut RuleMemory,
    last_output: bool,
    now_ms: u64,
) -> bool {
    if on_delay_ms == 0 && off_delay_ms == 0 {
        memory.has_pending = false;
        return desired;
    }

    let delay = if desired { on_delay_ms } else { off_delay_ms };

    if !memory.has_pending || memory.pending_target != desired {
        memory.pending_target = desired;
        memory.has_pending = true;
        memory.pending_deadline_ms = now_ms + u64::from(delay);
    }

    if delay == 0 || now_ms >= memory.pending_deadline_ms {
        memory.has_pending = false;
        return desired;
    }

    last_output
}
