//! Rule expressions and their evaluator.
//!
//! An expression maps the current (and previous) input vectors to a boolean
//! demand for one relay.  Evaluation never faults: an input number outside
//! the configured range reads as `false`, and an empty operand list yields
//! `false`.
//!
//! | `op`          | Result                                              |
//! |---------------|-----------------------------------------------------|
//! | `NONE`        | `false`                                             |
//! | `FOLLOW`      | level of `in`                                       |
//! | `AND`/`OR`    | conjunction / disjunction over `ins`                |
//! | `XOR`         | parity over `ins` (odd number of highs)             |
//! | `TOGGLE_RISE` | latched bit, flipped on each rising edge of `in`    |
//! | `PULSE_RISE`  | high for `pulseMs` after each rising edge of `in`   |

use log::warn;
use serde::{Deserialize, Serialize};

use super::RuleMemory;
use crate::io::{InputVector, rising_edge};

/// Pulse length when a `PULSE_RISE` expression omits `pulseMs`.
pub const DEFAULT_PULSE_MS: u32 = 200;

fn default_pulse_ms() -> u32 {
    DEFAULT_PULSE_MS
}

fn default_op() -> String {
    "FOLLOW".into()
}

fn default_input() -> i32 {
    1
}

/// Closed set of rule operators.  Input numbers are 1-based and signed so
/// that any stored number parses; out-of-range ones read as `false`.
///
/// Reading is lenient: a missing `op` means `FOLLOW`, a missing `in` means
/// input 1, a missing `ins` is empty, and an unknown `op` becomes `NONE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE", from = "RawExpression")]
pub enum Expression {
    None,
    Follow {
        #[serde(rename = "in")]
        input: i32,
    },
    And {
        ins: Vec<i32>,
    },
    Or {
        ins: Vec<i32>,
    },
    Xor {
        ins: Vec<i32>,
    },
    #[serde(rename = "TOGGLE_RISE")]
    ToggleOnRise {
        #[serde(rename = "in")]
        input: i32,
    },
    #[serde(rename = "PULSE_RISE")]
    PulseOnRise {
        #[serde(rename = "in")]
        input: i32,
        #[serde(rename = "pulseMs")]
        duration_ms: u32,
    },
}

impl Expression {
    /// `FOLLOW` wired to `input`.
    pub const fn follow(input: i32) -> Self {
        Self::Follow { input }
    }
}

impl Default for Expression {
    fn default() -> Self {
        Self::follow(1)
    }
}

/// Stored shape of an expression, every field optional.
#[derive(Deserialize)]
struct RawExpression {
    #[serde(default = "default_op")]
    op: String,
    #[serde(rename = "in", default = "default_input")]
    input: i32,
    #[serde(default)]
    ins: Vec<i32>,
    #[serde(rename = "pulseMs", default = "default_pulse_ms")]
    pulse_ms: u32,
}

impl From<RawExpression> for Expression {
    fn from(raw: RawExpression) -> Self {
        let RawExpression {
            op,
            input,
            ins,
            pulse_ms,
        } = raw;
        match op.as_str() {
            "NONE" => Self::None,
            "FOLLOW" => Self::Follow { input },
            "AND" => Self::And { ins },
            "OR" => Self::Or { ins },
            "XOR" => Self::Xor { ins },
            "TOGGLE_RISE" => Self::ToggleOnRise { input },
            "PULSE_RISE" => Self::PulseOnRise {
                input,
                duration_ms: pulse_ms,
            },
            other => {
                warn!("Rules: unknown op '{}', relay held off", other);
                Self::None
            }
        }
    }
}

/// Evaluate `expr` for one relay.
///
/// Pure apart from the toggle bit and pulse deadline in `memory`.
pub fn evaluate(
    expr: &Expression,
    inputs: &InputVector,
    previous: &InputVector,
    memory: &mut RuleMemory,
    now_ms: u64,
) -> bool {
    match expr {
        Expression::None => false,
        Expression::Follow { input } => inputs.level(*input),
        Expression::And { ins } => !ins.is_empty() && ins.iter().all(|i| inputs.level(*i)),
        Expression::Or { ins } => ins.iter().any(|i| inputs.level(*i)),
        Expression::Xor { ins } => ins.iter().filter(|i| inputs.level(**i)).count() % 2 == 1,
        Expression::ToggleOnRise { input } => {
            if rising_edge(inputs, previous, *input) {
                memory.toggle_bit = !memory.toggle_bit;
            }
            memory.toggle_bit
        }
        Expression::PulseOnRise { input, duration_ms } => {
            if rising_edge(inputs, previous, *input) {
                memory.pulse_until_ms = now_ms + u64::from(*duration_ms);
            }
            now_ms < memory.pulse_until_ms
        }
    }
}
