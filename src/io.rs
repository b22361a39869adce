//! Input/Output model.
//!
//! Typed containers for raw input levels and commanded relay levels.  They
//! own no decision logic; every accessor is bounds-checked so an
//! out-of-range index degrades to `false` instead of faulting.
//!
//! External contracts number inputs and relays from 1.  Internally the
//! containers are indexed from 0; the `*_number` accessors translate.

use core::str::FromStr;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Digital input levels for one control cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputVector {
    levels: Vec<bool>,
}

impl InputVector {
    pub fn new(count: usize) -> Self {
        Self {
            levels: vec![false; count],
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level of input `number` (1-based).  Out of range, zero and negative
    /// numbers read as `false`.
    pub fn level(&self, number: i32) -> bool {
        usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.levels.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Overwrite in place from a raw sample.  Missing trailing entries read
    /// as `false`; extra entries are ignored.
    pub fn load(&mut self, raw: &[bool]) {
        for (i, level) in self.levels.iter_mut().enumerate() {
            *level = raw.get(i).copied().unwrap_or(false);
        }
    }

    /// Copy levels from another vector of the same shape.
    pub fn snapshot_from(&mut self, other: &InputVector) {
        self.levels.clone_from(&other.levels);
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.levels
    }
}

/// True when input `number` went from low to high between `previous` and
/// `current`.  An out-of-range input never rises.
pub fn rising_edge(current: &InputVector, previous: &InputVector, number: i32) -> bool {
    current.level(number) && !previous.level(number)
}

// ---------------------------------------------------------------------------
// Relays
// ---------------------------------------------------------------------------

/// Per-relay output layers.
///
/// `output` is derived by the arbitration layer every cycle and is never
/// written anywhere else.
#[derive(Debug, Clone, Default)]
pub struct RelayVector {
    /// Debounced simple-rule demand.
    pub simple_layer: Vec<bool>,
    /// Shutter state-machine demand (only meaningful on reserved relays).
    pub shutter_layer: Vec<bool>,
    /// Arbitrated level sent to the output sink.
    pub output: Vec<bool>,
    /// Relays owned by enabled shutters.
    pub reserved: ReservationMap,
}

impl RelayVector {
    pub fn new(count: usize) -> Self {
        Self {
            simple_layer: vec![false; count],
            shutter_layer: vec![false; count],
            output: vec![false; count],
            reserved: ReservationMap::new(count),
        }
    }

    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reservation map
// ---------------------------------------------------------------------------

/// Set of relays claimed by enabled shutters.  Rebuilt whenever shutter
/// configuration changes; read-only to everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationMap {
    reserved: Vec<bool>,
}

impl ReservationMap {
    pub fn new(count: usize) -> Self {
        Self {
            reserved: vec![false; count],
        }
    }

    /// Replace the map with the given `(up, down)` 0-based relay pairs.
    /// Indices outside the relay range are skipped.
    pub fn rebuild(&mut self, pairs: impl IntoIterator<Item = (usize, usize)>) {
        self.clear();
        for (up, down) in pairs {
            for idx in [up, down] {
                if let Some(slot) = self.reserved.get_mut(idx) {
                    *slot = true;
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.reserved.iter_mut().for_each(|r| *r = false);
    }

    /// Whether relay index `idx` (0-based) is reserved.
    pub fn contains(&self, idx: usize) -> bool {
        self.reserved.get(idx).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.reserved.iter().filter(|r| **r).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.reserved
    }
}

// ---------------------------------------------------------------------------
// Manual override
// ---------------------------------------------------------------------------

/// Per-relay manual override.  Persists until explicitly set back to `Auto`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverrideMode {
    #[default]
    Auto,
    ForceOn,
    ForceOff,
}

impl OverrideMode {
    /// Wire code used by the state document: -1 auto, 0 off, 1 on.
    pub const fn code(self) -> i8 {
        match self {
            Self::Auto => -1,
            Self::ForceOff => 0,
            Self::ForceOn => 1,
        }
    }

    /// Forced level, or `None` when the relay follows its layers.
    pub const fn forced_level(self) -> Option<bool> {
        match self {
            Self::Auto => None,
            Self::ForceOn => Some(true),
            Self::ForceOff => Some(false),
        }
    }

    /// Successor for a TOGGLE request: on becomes off, anything else on.
    pub const fn toggled(self) -> Self {
        match self {
            Self::ForceOn => Self::ForceOff,
            Self::Auto | Self::ForceOff => Self::ForceOn,
        }
    }
}

impl FromStr for OverrideMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "FORCE_ON" | "ON" => Ok(Self::ForceOn),
            "FORCE_OFF" | "OFF" => Ok(Self::ForceOff),
            _ => Err(()),
        }
    }
}
