//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (HTTP, MQTT,
//! serial console) that the [`AppService`](super::service::AppService)
//! applies strictly between control ticks.

use crate::config::RulesDocument;
use crate::io::OverrideMode;
use crate::shutter::ManualCommand;

/// Commands that external adapters can send into the application core.
/// Relay and shutter numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Set a relay's manual override.
    SetOverride { relay: usize, mode: OverrideMode },

    /// Flip a relay between forced on and forced off.
    ToggleOverride { relay: usize },

    /// Drive a shutter manually, or hand it back to its buttons.
    SetManual { shutter: usize, cmd: ManualCommand },

    /// Validate, persist and apply a new rules document.
    ReplaceRules(RulesDocument),
}

impl AppCommand {
    /// Parse a relay command payload: `ON`, `OFF`, `AUTO` (also the
    /// `FORCE_*` spellings) or `TOGGLE`.
    pub fn relay_payload(relay: usize, payload: &str) -> Option<Self> {
        if payload.trim().eq_ignore_ascii_case("TOGGLE") {
            return Some(Self::ToggleOverride { relay });
        }
        let mode = payload.parse().ok()?;
        Some(Self::SetOverride { relay, mode })
    }

    /// Parse a shutter command payload: `OPEN`/`UP`, `CLOSE`/`DOWN`,
    /// `STOP` or `AUTO`.
    pub fn shutter_payload(shutter: usize, payload: &str) -> Option<Self> {
        let cmd = payload.parse().ok()?;
        Some(Self::SetManual { shutter, cmd })
    }
}
