//! Shutter (cover) safety state machine.
//!
//! One instance per configured shutter.  A shutter owns two relays (up and
//! down) which must never be energised together.
//!
//! ```text
//!           ┌──────── demand Up ────────┐
//!           │                           ▼
//!         STOP ◀── reversal ──────▶ MOVING_UP
//!           ▲   (arms dead-time)        │
//!           │                           │ max-run / Stop
//!           └──── demand Down ──▶ MOVING_DOWN
//! ```
//!
//! ## Per-cycle order
//!
//! 1. **Max-run guard** – a move older than `max_run_ms` is forced to Stop
//!    and any manual command is dropped.
//! 2. **Demand** – manual command first (`Stop` is consumed immediately),
//!    otherwise buttons: level-based in hold mode, edge-based in toggle
//!    mode.
//! 3. **Commit** – dead-time and reversal rules decide whether the demand
//!    is applied, deferred, or turned into a Stop.
//!
//! A cooldown is not a state of its own: while `now < cooldown_until_ms`
//! the shutter behaves as a forced Stop.

use heapless::String;
use log::{error, info, warn};
use serde::Serialize;

use crate::io::InputVector;

/// Maximum shutter name length.
pub const NAME_CAPACITY: usize = 32;

pub type ShutterName = String<NAME_CAPACITY>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How buttons translate into motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterMode {
    /// Motion follows the button level every cycle.
    Hold,
    /// A rising edge starts motion; the next rising edge stops it.
    Toggle,
}

impl ShutterMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hold" => Some(Self::Hold),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Toggle => "toggle",
        }
    }
}

/// Resolution when both hold-mode buttons are pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterPriority {
    Stop,
    Up,
    Down,
}

impl ShutterPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stop" => Some(Self::Stop),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    const fn as_move(self) -> ShutterMove {
        match self {
            Self::Stop => ShutterMove::Stop,
            Self::Up => ShutterMove::Up,
            Self::Down => ShutterMove::Down,
        }
    }
}

/// Validated shutter configuration.  Input and relay numbers are 1-based
/// and known to be in range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutterConfig {
    pub enabled: bool,
    pub name: ShutterName,
    pub up_input: u16,
    pub down_input: u16,
    pub up_relay: u16,
    pub down_relay: u16,
    pub mode: ShutterMode,
    pub priority: ShutterPriority,
    pub deadtime_ms: u32,
    pub max_run_ms: u32,
}

impl ShutterConfig {
    /// 0-based index of the up relay.
    pub fn up_idx(&self) -> usize {
        usize::from(self.up_relay).saturating_sub(1)
    }

    /// 0-based index of the down relay.
    pub fn down_idx(&self) -> usize {
        usize::from(self.down_relay).saturating_sub(1)
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Externally visible motion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutterMove {
    #[default]
    Stop,
    Up,
    Down,
}

/// Command accepted by the shutter command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualCommand {
    Up,
    Down,
    Stop,
    /// Hand control back to the buttons.
    Auto,
}

impl core::str::FromStr for ManualCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" | "OPEN" => Ok(Self::Up),
            "DOWN" | "CLOSE" => Ok(Self::Down),
            "STOP" => Ok(Self::Stop),
            "AUTO" => Ok(Self::Auto),
            _ => Err(()),
        }
    }
}

/// Mutable per-shutter state.  Reset whenever the shutter's configuration
/// changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutterRuntime {
    pub motion: ShutterMove,
    pub move_start_ms: u64,
    pub cooldown_until_ms: u64,
    pub last_up_button: bool,
    pub last_down_button: bool,
    /// Pending manual command; `None` means buttons are in control.
    pub manual: Option<ShutterMove>,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shutter {
    config: ShutterConfig,
    runtime: ShutterRuntime,
}

impl Shutter {
    pub fn new(config: ShutterConfig) -> Self {
        Self {
            config,
            runtime: ShutterRuntime::default(),
        }
    }

    pub fn config(&self) -> &ShutterConfig {
        &self.config
    }

    pub fn runtime(&self) -> &ShutterRuntime {
        &self.runtime
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn motion(&self) -> ShutterMove {
        self.runtime.motion
    }

    /// Milliseconds of dead-time left at `now_ms`.
    pub fn cooldown_remaining(&self, now_ms: u64) -> u64 {
        self.runtime.cooldown_until_ms.saturating_sub(now_ms)
    }

    /// Disable the shutter; it stops contributing outputs and reservations.
    pub fn disable(&mut self) {
        self.config.enabled = false;
        self.runtime = ShutterRuntime::default();
    }

    /// Record a manual command; it is consumed on the next tick.
    pub fn set_manual(&mut self, cmd: ManualCommand) {
        self.runtime.manual = match cmd {
            ManualCommand::Up => Some(ShutterMove::Up),
            ManualCommand::Down => Some(ShutterMove::Down),
            ManualCommand::Stop => Some(ShutterMove::Stop),
            ManualCommand::Auto => None,
        };
    }

    /// Advance one control cycle, writing this shutter's two relays into
    /// `layer`.  Disabled shutters touch nothing.
    pub fn tick(&mut self, inputs: &InputVector, layer: &mut [bool], now_ms: u64) {
        if !self.config.enabled {
            return;
        }

        if self.max_run_elapsed(now_ms) {
            warn!(
                "Shutter '{}': max run {}ms reached, stopping",
                self.config.name, self.config.max_run_ms
            );
            self.force_stop(layer);
            return;
        }

        let demand = match self.runtime.manual {
            Some(ShutterMove::Stop) => {
                self.force_stop(layer);
                return;
            }
            Some(manual) => manual,
            None => match self.config.mode {
                ShutterMode::Hold => self.hold_demand(inputs),
                ShutterMode::Toggle => self.toggle_demand(inputs),
            },
        };

        self.command(demand, layer, now_ms);
    }

    // ── Demand ────────────────────────────────────────────────

    fn hold_demand(&self, inputs: &InputVector) -> ShutterMove {
        let up = inputs.level(i32::from(self.config.up_input));
        let down = inputs.level(i32::from(self.config.down_input));
        match (up, down) {
            (true, true) => self.config.priority.as_move(),
            (true, false) => ShutterMove::Up,
            (false, true) => ShutterMove::Down,
            (false, false) => ShutterMove::Stop,
        }
    }

    /// Edges are detected against the shutter's own button memory, which is
    /// updated on every toggle-mode evaluation.
    fn toggle_demand(&mut self, inputs: &InputVector) -> ShutterMove {
        let up = inputs.level(i32::from(self.config.up_input));
        let down = inputs.level(i32::from(self.config.down_input));
        let up_rise = up && !self.runtime.last_up_button;
        let down_rise = down && !self.runtime.last_down_button;
        self.runtime.last_up_button = up;
        self.runtime.last_down_button = down;

        let current = self.runtime.motion;
        match (up_rise, down_rise) {
            (true, true) => ShutterMove::Stop,
            (true, false) if current == ShutterMove::Up => ShutterMove::Stop,
            (true, false) => ShutterMove::Up,
            (false, true) if current == ShutterMove::Down => ShutterMove::Stop,
            (false, true) => ShutterMove::Down,
            (false, false) => current,
        }
    }

    // ── Commit ────────────────────────────────────────────────

    fn command(&mut self, demand: ShutterMove, layer: &mut [bool], now_ms: u64) {
        let rt = &mut self.runtime;

        if demand == ShutterMove::Stop || now_ms < rt.cooldown_until_ms {
            self.set_motion(ShutterMove::Stop, now_ms);
            self.set_outputs(layer);
            return;
        }

        if rt.motion != ShutterMove::Stop && rt.motion != demand {
            rt.cooldown_until_ms = now_ms + u64::from(self.config.deadtime_ms);
            info!(
                "Shutter '{}': reversal, dead-time {}ms",
                self.config.name, self.config.deadtime_ms
            );
            self.set_motion(ShutterMove::Stop, now_ms);
            self.set_outputs(layer);
            return;
        }

        self.set_motion(demand, now_ms);
        self.set_outputs(layer);
    }

    fn set_motion(&mut self, motion: ShutterMove, now_ms: u64) {
        if self.runtime.motion == motion {
            return;
        }
        info!("Shutter '{}': {:?} -> {:?}", self.config.name, self.runtime.motion, motion);
        self.runtime.motion = motion;
        if motion != ShutterMove::Stop {
            self.runtime.move_start_ms = now_ms;
        }
    }

    fn force_stop(&mut self, layer: &mut [bool]) {
        if self.runtime.motion != ShutterMove::Stop {
            info!("Shutter '{}': forced stop", self.config.name);
        }
        self.runtime.motion = ShutterMove::Stop;
        self.runtime.manual = None;
        self.set_outputs(layer);
    }

    fn max_run_elapsed(&self, now_ms: u64) -> bool {
        self.runtime.motion != ShutterMove::Stop
            && self.config.max_run_ms > 0
            && now_ms.saturating_sub(self.runtime.move_start_ms) >= u64::from(self.config.max_run_ms)
    }

    fn set_outputs(&mut self, layer: &mut [bool]) {
        let mut up = self.runtime.motion == ShutterMove::Up;
        let mut down = self.runtime.motion == ShutterMove::Down;

        if up && down {
            error!("Shutter '{}': interlock violated, stopping", self.config.name);
            up = false;
            down = false;
            self.runtime.motion = ShutterMove::Stop;
        }

        if let Some(slot) = layer.get_mut(self.config.up_idx()) {
            *slot = up;
        }
        if let Some(slot) = layer.get_mut(self.config.down_idx()) {
            *slot = down;
        }
    }
}
