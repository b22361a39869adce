//! Simple rules engine.
//!
//! One [`RuleSpec`] per relay.  Every cycle each relay's expression is
//! evaluated, optionally inverted, then passed through the on/off delay
//! stage; the result becomes that relay's simple-layer level.
//!
//! ```text
//!  inputs ──▶ evaluate(expr) ──▶ invert? ──▶ debounce(on/off) ──▶ simple_layer[i]
//! ```

pub mod debounce;
pub mod expr;

use serde::{Deserialize, Serialize};

use crate::io::InputVector;
use debounce::debounce;
use expr::{Expression, evaluate};

/// Per-relay rule as stored in the rules document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// A missing `expr` means `FOLLOW` input 1.
    #[serde(rename = "expr", default)]
    pub expression: Expression,
    #[serde(default)]
    pub invert: bool,
    #[serde(rename = "onDelay", default)]
    pub on_delay_ms: u32,
    #[serde(rename = "offDelay", default)]
    pub off_delay_ms: u32,
}

impl RuleSpec {
    /// `FOLLOW` rule with no inversion and no delays.
    pub fn follow(input: i32) -> Self {
        Self {
            expression: Expression::follow(input),
            invert: false,
            on_delay_ms: 0,
            off_delay_ms: 0,
        }
    }
}

/// Per-relay evaluator memory.  Survives across cycles; reset whenever a
/// new rule set is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleMemory {
    pub toggle_bit: bool,
    pub pulse_until_ms: u64,
    pub pending_target: bool,
    pub has_pending: bool,
    pub pending_deadline_ms: u64,
}

/// Drives the evaluator and delay stage across all relays.
#[derive(Debug, Clone, Default)]
pub struct SimpleRulesEngine {
    rules: Vec<RuleSpec>,
    memory: Vec<RuleMemory>,
}

impl SimpleRulesEngine {
    pub fn new(rules: Vec<RuleSpec>) -> Self {
        let memory = vec![RuleMemory::default(); rules.len()];
        Self { rules, memory }
    }

    /// Swap in a new rule set.  All evaluator memory starts fresh.
    pub fn load(&mut self, rules: Vec<RuleSpec>) {
        *self = Self::new(rules);
    }

    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    pub fn memory(&self, relay_idx: usize) -> Option<&RuleMemory> {
        self.memory.get(relay_idx)
    }

    /// Recompute `simple_layer` in place.  Its previous contents are the
    /// last emitted levels used by the delay stage.  Relays without a rule
    /// read `false`.
    pub fn evaluate_all(
        &mut self,
        inputs: &InputVector,
        previous: &InputVector,
        simple_layer: &mut [bool],
        now_ms: u64,
    ) {
        for (idx, level) in simple_layer.iter_mut().enumerate() {
            let (Some(rule), Some(memory)) = (self.rules.get(idx), self.memory.get_mut(idx)) else {
                *level = false;
                continue;
            };

            let raw = evaluate(&rule.expression, inputs, previous, memory, now_ms);
            let desired = raw != rule.invert;
            *level = debounce(
                desired,
                rule.on_delay_ms,
                rule.off_delay_ms,
                memory,
                *level,
                now_ms,
            );
        }
    }
}
