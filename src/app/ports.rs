//! Port traits: the hexagonal boundary between the engine and the outside
//! world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (expander bank, clock, NVS, log) implement these traits.
//! The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly.

use crate::config::RulesDocument;
use crate::error::StoreError;

// ───────────────────────────────────────────────────────────────
// Input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one raw sample of every digital input per cycle.
pub trait InputPort {
    /// Fill `levels` (index 0 is input 1).  Inputs that cannot be read
    /// must be reported as `false`.
    fn read_inputs(&mut self, levels: &mut [bool]);
}

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: receives the arbitrated relay vector once per cycle.
pub trait OutputPort {
    /// Drive every relay (index 0 is relay 1).
    fn write_relays(&mut self, levels: &[bool]);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic, non-decreasing milliseconds since an arbitrary epoch.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT,
/// HTTP state cache, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Rules store (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the rules document.
///
/// The service only ever hands documents that already passed validation to
/// [`save`](RulesStore::save); a store must not alter them.
pub trait RulesStore {
    /// Last persisted document.  [`StoreError::NotFound`] on first boot,
    /// [`StoreError::Corrupted`] when the stored text does not parse.
    fn load(&self) -> Result<RulesDocument, StoreError>;

    /// Persist atomically: on error the previously stored document stays.
    fn save(&mut self, doc: &RulesDocument) -> Result<(), StoreError>;
}
