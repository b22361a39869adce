//! Configuration for the RelayBox controller.
//!
//! Two layers:
//!
//! - [`RulesDocument`] is the user-editable rule/shutter document, exchanged
//!   as JSON with the HTTP/MQTT collaborators and persisted in NVS.  It is
//!   only ever applied through [`validate::validate`].
//! - [`ControllerConfig`] holds board and timing parameters that do not
//!   change at runtime.

pub mod validate;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rules::RuleSpec;

/// Current rules document version.
pub const DOCUMENT_VERSION: u32 = 2;

pub const DEFAULT_DEADTIME_MS: i64 = 400;
pub const DEFAULT_MAX_RUN_MS: i64 = 25_000;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

fn default_true() -> bool {
    true
}

fn default_up_in() -> i32 {
    1
}

fn default_down_in() -> i32 {
    2
}

fn default_mode() -> String {
    "hold".into()
}

fn default_priority() -> String {
    "stop".into()
}

fn default_deadtime() -> i64 {
    DEFAULT_DEADTIME_MS
}

fn default_max_run() -> i64 {
    DEFAULT_MAX_RUN_MS
}

// ---------------------------------------------------------------------------
// Rules document
// ---------------------------------------------------------------------------

/// Raw rule/shutter document.  Shapes only; ranges are checked by the
/// validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    pub relays: Vec<RuleSpec>,
    #[serde(default)]
    pub shutters: Vec<ShutterEntry>,
}

/// Raw shutter entry.  Numeric fields are signed so that out-of-range
/// values survive deserialisation and are reported by the validator;
/// `mode` and `priority` stay strings for the same reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutterEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `Shutter N`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_up_in")]
    pub up_in: i32,
    #[serde(default = "default_down_in")]
    pub down_in: i32,
    /// Defaults to relay `2N-1` for shutter `N`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_relay: Option<i32>,
    /// Defaults to relay `2N` for shutter `N`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_relay: Option<i32>,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_deadtime")]
    pub deadtime_ms: i64,
    #[serde(default = "default_max_run")]
    pub max_run_ms: i64,
}

impl ShutterEntry {
    /// Fully-populated default entry for array position `slot` (0-based).
    pub fn default_for(slot: usize) -> Self {
        let base = (slot * 2) as i32;
        Self {
            enabled: true,
            name: Some(default_shutter_name(slot)),
            up_in: default_up_in(),
            down_in: default_down_in(),
            up_relay: Some(base + 1),
            down_relay: Some(base + 2),
            mode: default_mode(),
            priority: default_priority(),
            deadtime_ms: DEFAULT_DEADTIME_MS,
            max_run_ms: DEFAULT_MAX_RUN_MS,
        }
    }

    /// Relay numbers with slot defaults applied.
    pub fn relays_for(&self, slot: usize) -> (i32, i32) {
        let base = (slot * 2) as i32;
        (self.up_relay.unwrap_or(base + 1), self.down_relay.unwrap_or(base + 2))
    }
}

pub fn default_shutter_name(slot: usize) -> String {
    format!("Shutter {}", slot + 1)
}

/// Default rule for relay index `idx`: follow the same-numbered input, or
/// input 1 when there are fewer inputs than relays.
fn default_rule(idx: usize, input_count: usize) -> RuleSpec {
    let number = idx + 1;
    let input = if number <= input_count { number } else { 1 };
    RuleSpec::follow(input as i32)
}

impl RulesDocument {
    /// One `FOLLOW` rule per relay, no shutters.
    pub fn default_for(relay_count: usize, input_count: usize) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            relays: (0..relay_count).map(|i| default_rule(i, input_count)).collect(),
            shutters: Vec::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|_| Error::Parse)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|_| Error::Parse)
    }

    /// Resize `relays` to `relay_count`, keeping existing entries and
    /// padding with default rules.  Shutters are left alone.
    ///
    /// Returns `true` when the document changed and should be written back.
    pub fn normalize(&mut self, relay_count: usize, input_count: usize) -> bool {
        let len = self.relays.len();
        if len == relay_count {
            return false;
        }
        self.relays.truncate(relay_count);
        self.relays
            .extend((len.min(relay_count)..relay_count).map(|i| default_rule(i, input_count)));
        true
    }
}

// ---------------------------------------------------------------------------
// Controller configuration
// ---------------------------------------------------------------------------

/// Board and timing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Control loop period (milliseconds)
    pub loop_interval_ms: u32,
    /// Telemetry / state-log period (milliseconds)
    pub telemetry_interval_ms: u32,
    /// Task watchdog timeout (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- I/O expander bus ---
    /// I2C bus frequency in Hz
    pub i2c_freq_hz: u32,
    /// Address of the first PCA9538 module
    pub expander_base_addr: u8,
    /// Number of consecutive addresses scanned
    pub max_modules: u8,
    /// Relay coils energise on a low output bit
    pub relay_active_low: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            loop_interval_ms: 10,        // 100 Hz
            telemetry_interval_ms: 1000, // 1 Hz
            watchdog_timeout_ms: 10_000,

            // Expander bus
            i2c_freq_hz: 100_000,
            expander_base_addr: 0x70,
            max_modules: 4,
            relay_active_low: false,
        }
    }
}
