//! Decision engine aggregate.
//!
//! [`Engine`] exclusively owns every piece of per-cycle state: the input
//! snapshots, the relay layers, rule memory, overrides, shutter state
//! machines and the reservation map.  Collaborators only feed it input
//! samples, read back the final relay vector, and submit commands.
//!
//! ## Tick order
//!
//! ```text
//!  load inputs ─▶ shutters ─▶ simple rules ─▶ arbitrate ─▶ previous = inputs
//! ```
//!
//! Commands must be applied strictly between ticks; the application layer
//! serialises them through its command channel.

use log::{error, info, warn};
use serde::Serialize;

use crate::config::RulesDocument;
use crate::config::validate::{RuleSet, validate};
use crate::error::{ConfigValidationError, Error, Result};
use crate::io::{InputVector, OverrideMode, RelayVector};
use crate::rules::SimpleRulesEngine;
use crate::safety::arbitrate;
use crate::shutter::{ManualCommand, Shutter, ShutterMove, ShutterName};

/// How a persisted document was taken into use at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Applied as stored.
    Loaded,
    /// Applied after resizing `relays`; the caller should persist
    /// [`Engine::document`].
    Normalized,
    /// Missing or unreadable; defaults applied.
    Defaulted,
    /// Stored document failed validation; rules kept, shutters disabled.
    FailSafe(ConfigValidationError),
}

pub struct Engine {
    input_count: usize,
    relay_count: usize,
    inputs: InputVector,
    previous: InputVector,
    relays: RelayVector,
    overrides: Vec<OverrideMode>,
    simple: SimpleRulesEngine,
    shutters: Vec<Shutter>,
    rule_set: RuleSet,
}

impl Engine {
    /// Engine sized for the detected hardware, running the default
    /// document.
    pub fn new(input_count: usize, relay_count: usize) -> Self {
        let mut engine = Self {
            input_count,
            relay_count,
            inputs: InputVector::new(input_count),
            previous: InputVector::new(input_count),
            relays: RelayVector::new(relay_count),
            overrides: vec![OverrideMode::Auto; relay_count],
            simple: SimpleRulesEngine::default(),
            shutters: Vec::new(),
            rule_set: RuleSet {
                rules: Vec::new(),
                shutters: Vec::new(),
            },
        };
        engine.apply_defaults();
        engine
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn relay_count(&self) -> usize {
        self.relay_count
    }

    /// Maximum number of shutters the relay count allows.
    pub fn shutter_limit(&self) -> usize {
        self.relay_count / 2
    }

    pub fn inputs(&self) -> &InputVector {
        &self.inputs
    }

    pub fn relays(&self) -> &RelayVector {
        &self.relays
    }

    /// Final relay levels from the last tick.
    pub fn outputs(&self) -> &[bool] {
        &self.relays.output
    }

    pub fn shutters(&self) -> &[Shutter] {
        &self.shutters
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    // ── Tick ──────────────────────────────────────────────────

    /// Run one control cycle over a raw input sample and return the final
    /// relay levels.
    pub fn tick(&mut self, raw_inputs: &[bool], now_ms: u64) -> &[bool] {
        self.inputs.load(raw_inputs);

        self.relays.shutter_layer.iter_mut().for_each(|r| *r = false);
        for shutter in &mut self.shutters {
            shutter.tick(&self.inputs, &mut self.relays.shutter_layer, now_ms);
        }

        self.simple
            .evaluate_all(&self.inputs, &self.previous, &mut self.relays.simple_layer, now_ms);

        arbitrate(&mut self.relays, &self.overrides, &self.shutters);

        self.previous.snapshot_from(&self.inputs);
        &self.relays.output
    }

    // ── Override surface ──────────────────────────────────────

    fn relay_index(&self, relay: usize) -> Result<usize> {
        match relay.checked_sub(1) {
            Some(idx) if idx < self.relay_count => Ok(idx),
            _ => Err(Error::RelayOutOfRange { relay }),
        }
    }

    fn writable_relay(&self, relay: usize) -> Result<usize> {
        let idx = self.relay_index(relay)?;
        if self.relays.reserved.contains(idx) {
            return Err(Error::ReservedRelay { relay });
        }
        Ok(idx)
    }

    /// Override state of relay `relay` (1-based).
    pub fn override_mode(&self, relay: usize) -> Option<OverrideMode> {
        relay.checked_sub(1).and_then(|i| self.overrides.get(i)).copied()
    }

    /// Set relay `relay` (1-based).  Refused without any state change on
    /// reserved relays.
    pub fn set_override(&mut self, relay: usize, mode: OverrideMode) -> Result<()> {
        let idx = self.writable_relay(relay)?;
        self.overrides[idx] = mode;
        Ok(())
    }

    /// Flip relay `relay` between forced on and forced off.  Returns the
    /// new mode.
    pub fn toggle_override(&mut self, relay: usize) -> Result<OverrideMode> {
        let idx = self.writable_relay(relay)?;
        let mode = self.overrides[idx].toggled();
        self.overrides[idx] = mode;
        Ok(mode)
    }

    // ── Shutter surface ───────────────────────────────────────

    /// Queue a manual command for shutter `shutter` (1-based); it takes
    /// effect on the next tick.
    pub fn set_manual(&mut self, shutter: usize, cmd: ManualCommand) -> Result<()> {
        let idx = match shutter.checked_sub(1) {
            Some(idx) if idx < self.shutter_limit() => idx,
            _ => return Err(Error::ShutterOutOfRange { shutter }),
        };
        match self.shutters.get_mut(idx) {
            Some(s) if s.is_enabled() => {
                s.set_manual(cmd);
                Ok(())
            }
            _ => Err(Error::ShutterDisabled { shutter }),
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Validate `doc` against this engine's counts without applying it.
    pub fn validate(&self, doc: &RulesDocument) -> Result<RuleSet> {
        Ok(validate(doc, self.relay_count, self.input_count)?)
    }

    /// Validate and apply `doc`.  On failure the live configuration is
    /// untouched.
    pub fn replace_rules(&mut self, doc: &RulesDocument) -> Result<()> {
        let set = self.validate(doc)?;
        self.apply(set);
        Ok(())
    }

    /// Take a validated rule set into use.
    ///
    /// Rule memory starts fresh.  A shutter keeps its runtime only when its
    /// configuration at the same position is unchanged.
    pub fn apply(&mut self, set: RuleSet) {
        self.simple.load(set.rules.clone());

        let mut old = core::mem::take(&mut self.shutters).into_iter();
        self.shutters = set
            .shutters
            .iter()
            .map(|cfg| match old.next() {
                Some(prev) if prev.config() == cfg => prev,
                _ => Shutter::new(cfg.clone()),
            })
            .collect();

        self.relays.reserved.rebuild(set.reserved_pairs());
        info!(
            "Rules applied: {} relays, {} shutters, {} reserved",
            set.rules.len(),
            set.shutters.len(),
            self.relays.reserved.count()
        );
        self.rule_set = set;
    }

    /// Apply a document read from persistent storage at boot.  `None` means
    /// nothing usable was stored.
    pub fn load_persisted(&mut self, doc: Option<RulesDocument>) -> LoadOutcome {
        let Some(mut doc) = doc else {
            warn!("Rules: no usable stored document, using defaults");
            self.apply_defaults();
            return LoadOutcome::Defaulted;
        };

        let normalized = doc.normalize(self.relay_count, self.input_count);
        if normalized {
            warn!("Rules: stored relay list resized to {}", self.relay_count);
        }

        match self.validate(&doc) {
            Ok(set) => {
                self.apply(set);
                if normalized {
                    LoadOutcome::Normalized
                } else {
                    LoadOutcome::Loaded
                }
            }
            Err(e) => {
                let reason = match e {
                    Error::Validation(v) => v,
                    _ => ConfigValidationError::RelayCountMismatch {
                        expected: self.relay_count,
                        actual: doc.relays.len(),
                    },
                };
                error!("Rules: stored document invalid ({}), shutters disabled", reason);
                self.apply(RuleSet {
                    rules: doc.relays,
                    shutters: Vec::new(),
                });
                LoadOutcome::FailSafe(reason)
            }
        }
    }

    /// Re-size for a new hardware configuration.  Overrides reset to Auto
    /// and the default document is loaded.
    pub fn resize(&mut self, input_count: usize, relay_count: usize) {
        info!("Engine resized: {} inputs, {} relays", input_count, relay_count);
        *self = Self::new(input_count, relay_count);
    }

    fn apply_defaults(&mut self) {
        let doc = RulesDocument::default_for(self.relay_count, self.input_count);
        self.apply(RuleSet {
            rules: doc.relays,
            shutters: Vec::new(),
        });
    }

    /// Live configuration as a document.
    pub fn document(&self) -> RulesDocument {
        self.rule_set.to_document()
    }

    // ── State read-back ───────────────────────────────────────

    pub fn snapshot(&self, now_ms: u64) -> StateSnapshot {
        StateSnapshot {
            inputs: self.inputs.as_slice().to_vec(),
            relays: self.relays.output.clone(),
            overrides: self.overrides.iter().map(|m| m.code()).collect(),
            reserved: self.relays.reserved.as_slice().to_vec(),
            shutters: self
                .shutters
                .iter()
                .map(|s| ShutterStatus {
                    enabled: s.is_enabled(),
                    name: s.config().name.clone(),
                    up_relay: s.config().up_relay,
                    down_relay: s.config().down_relay,
                    motion: s.motion(),
                    cooldown_ms: s.cooldown_remaining(now_ms),
                })
                .collect(),
            total_relays: self.relay_count,
            total_inputs: self.input_count,
            uptime_ms: now_ms,
        }
    }
}

/// Serializable view of the engine for state collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub inputs: Vec<bool>,
    pub relays: Vec<bool>,
    /// -1 auto, 0 forced off, 1 forced on.
    #[serde(rename = "override")]
    pub overrides: Vec<i8>,
    pub reserved: Vec<bool>,
    pub shutters: Vec<ShutterStatus>,
    pub total_relays: usize,
    pub total_inputs: usize,
    pub uptime_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShutterStatus {
    pub enabled: bool,
    pub name: ShutterName,
    pub up_relay: u16,
    pub down_relay: u16,
    #[serde(rename = "move")]
    pub motion: ShutterMove,
    pub cooldown_ms: u64,
}
