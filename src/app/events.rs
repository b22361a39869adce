//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish over MQTT,
//! refresh an HTTP state cache.

use crate::engine::{LoadOutcome, StateSnapshot};
use crate::shutter::ShutterMove;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Configuration loaded at boot.
    Started {
        inputs: usize,
        relays: usize,
        outcome: LoadOutcome,
    },

    /// The final relay vector differs from the previous tick's.
    RelaysChanged(Vec<bool>),

    /// A shutter's motion changed (shutter numbers are 1-based).
    ShutterMoved {
        shutter: usize,
        from: ShutterMove,
        to: ShutterMove,
    },

    /// A new rules document was validated, persisted and applied.
    RulesReplaced,

    /// Periodic state snapshot.
    Telemetry(StateSnapshot),
}
