//! Configuration validator.
//!
//! Turns a [`RulesDocument`] into an immutable [`RuleSet`] or rejects it
//! with the first violation found.  Pure: nothing is mutated on failure.
//!
//! Check order (first failure wins):
//!
//! 1. `relays` length equals the relay count.
//! 2. Per shutter, in array order: inputs in range, relays in range,
//!    distinct relays, mode, priority.
//! 3. Across enabled shutters: no relay claimed twice.
//!
//! Dead-time and max-run are clamped rather than rejected.  At most
//! `relay_count / 2` shutter entries are considered.

use log::warn;

use super::{RulesDocument, ShutterEntry, default_shutter_name};
use crate::error::ConfigValidationError;
use crate::rules::RuleSpec;
use crate::shutter::{ShutterConfig, ShutterMode, ShutterName, ShutterPriority};

pub const MAX_DEADTIME_MS: i64 = 60_000;
pub const MAX_RUN_MS: i64 = 600_000;

/// Validated, fully-populated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<RuleSpec>,
    pub shutters: Vec<ShutterConfig>,
}

impl RuleSet {
    /// Enabled shutters' `(up, down)` relay indices, 0-based.
    pub fn reserved_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.shutters
            .iter()
            .filter(|s| s.enabled)
            .map(|s| (s.up_idx(), s.down_idx()))
    }

    /// Normalised document form, with defaults and clamps applied.
    pub fn to_document(&self) -> RulesDocument {
        RulesDocument {
            version: super::DOCUMENT_VERSION,
            relays: self.rules.clone(),
            shutters: self
                .shutters
                .iter()
                .map(|s| ShutterEntry {
                    enabled: s.enabled,
                    name: Some(s.name.as_str().into()),
                    up_in: i32::from(s.up_input),
                    down_in: i32::from(s.down_input),
                    up_relay: Some(i32::from(s.up_relay)),
                    down_relay: Some(i32::from(s.down_relay)),
                    mode: s.mode.as_str().into(),
                    priority: s.priority.as_str().into(),
                    deadtime_ms: i64::from(s.deadtime_ms),
                    max_run_ms: i64::from(s.max_run_ms),
                })
                .collect(),
        }
    }
}

/// Validate `doc` against the detected hardware counts.
pub fn validate(
    doc: &RulesDocument,
    relay_count: usize,
    input_count: usize,
) -> Result<RuleSet, ConfigValidationError> {
    if doc.relays.len() != relay_count {
        return Err(ConfigValidationError::RelayCountMismatch {
            expected: relay_count,
            actual: doc.relays.len(),
        });
    }

    let limit = relay_count / 2;
    if doc.shutters.len() > limit {
        warn!(
            "Rules: {} shutter entries, only {} fit {} relays; ignoring the rest",
            doc.shutters.len(),
            limit,
            relay_count
        );
    }

    let shutters = doc
        .shutters
        .iter()
        .take(limit)
        .enumerate()
        .map(|(slot, entry)| validate_shutter(slot, entry, relay_count, input_count))
        .collect::<Result<Vec<_>, _>>()?;

    let mut claimed = vec![false; relay_count];
    for s in shutters.iter().filter(|s| s.enabled) {
        for idx in [s.up_idx(), s.down_idx()] {
            if claimed[idx] {
                return Err(ConfigValidationError::RelayConflict);
            }
            claimed[idx] = true;
        }
    }

    Ok(RuleSet {
        rules: doc.relays.clone(),
        shutters,
    })
}

fn in_range(value: i32, count: usize) -> Option<u16> {
    u16::try_from(value)
        .ok()
        .filter(|v| *v >= 1 && usize::from(*v) <= count)
}

fn validate_shutter(
    slot: usize,
    entry: &ShutterEntry,
    relay_count: usize,
    input_count: usize,
) -> Result<ShutterConfig, ConfigValidationError> {
    let shutter = slot + 1;

    let (Some(up_input), Some(down_input)) =
        (in_range(entry.up_in, input_count), in_range(entry.down_in, input_count))
    else {
        return Err(ConfigValidationError::InputOutOfRange { shutter });
    };

    let (up, down) = entry.relays_for(slot);
    let (Some(up_relay), Some(down_relay)) = (in_range(up, relay_count), in_range(down, relay_count))
    else {
        return Err(ConfigValidationError::RelayOutOfRange { shutter });
    };

    if up_relay == down_relay {
        return Err(ConfigValidationError::SameRelay { shutter });
    }

    let mode = ShutterMode::parse(&entry.mode).ok_or(ConfigValidationError::InvalidMode { shutter })?;
    let priority = ShutterPriority::parse(&entry.priority)
        .ok_or(ConfigValidationError::InvalidPriority { shutter })?;

    let name = match &entry.name {
        Some(n) => bounded_name(n),
        None => bounded_name(&default_shutter_name(slot)),
    };

    Ok(ShutterConfig {
        enabled: entry.enabled,
        name,
        up_input,
        down_input,
        up_relay,
        down_relay,
        mode,
        priority,
        deadtime_ms: entry.deadtime_ms.clamp(0, MAX_DEADTIME_MS) as u32,
        max_run_ms: entry.max_run_ms.clamp(0, MAX_RUN_MS) as u32,
    })
}

/// Truncate to the name capacity on a character boundary.
fn bounded_name(raw: &str) -> ShutterName {
    let mut name = ShutterName::new();
    for c in raw.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}
