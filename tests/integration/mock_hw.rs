//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full relay history
//! and event stream without touching a real I2C bus or flash.

use std::cell::Cell;

use relaybox::app::events::AppEvent;
use relaybox::app::ports::{ClockPort, EventSink, InputPort, OutputPort, RulesStore};
use relaybox::config::RulesDocument;
use relaybox::error::StoreError;

// ── MockHardware ──────────────────────────────────────────────

/// Input levels set by the test; every relay write is recorded.
pub struct MockHardware {
    pub inputs: Vec<bool>,
    pub writes: Vec<Vec<bool>>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(input_count: usize) -> Self {
        Self {
            inputs: vec![false; input_count],
            writes: Vec::new(),
        }
    }

    /// Set input `number` (1-based).
    pub fn set_input(&mut self, number: usize, level: bool) {
        self.inputs[number - 1] = level;
    }

    pub fn last_write(&self) -> &[bool] {
        self.writes.last().map_or(&[], Vec::as_slice)
    }

    /// Level of relay `number` (1-based) in the last write.
    pub fn relay(&self, number: usize) -> bool {
        self.last_write().get(number - 1).copied().unwrap_or(false)
    }
}

impl InputPort for MockHardware {
    fn read_inputs(&mut self, levels: &mut [bool]) {
        for (i, level) in levels.iter_mut().enumerate() {
            *level = self.inputs.get(i).copied().unwrap_or(false);
        }
    }
}

impl OutputPort for MockHardware {
    fn write_relays(&mut self, levels: &[bool]) {
        self.writes.push(levels.to_vec());
    }
}

// ── MockClock ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClock {
    now: Cell<u64>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(ms: u64) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl ClockPort for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// ── MockStore ─────────────────────────────────────────────────

/// In-memory rules store.  `fail_save` makes the next saves fail.
#[derive(Default)]
pub struct MockStore {
    pub stored: Option<Result<RulesDocument, StoreError>>,
    pub saves: Vec<RulesDocument>,
    pub fail_save: Option<StoreError>,
}

#[allow(dead_code)]
impl MockStore {
    pub fn with(doc: RulesDocument) -> Self {
        Self {
            stored: Some(Ok(doc)),
            ..Self::default()
        }
    }

    pub fn corrupted() -> Self {
        Self {
            stored: Some(Err(StoreError::Corrupted)),
            ..Self::default()
        }
    }
}

impl RulesStore for MockStore {
    fn load(&self) -> Result<RulesDocument, StoreError> {
        self.stored.clone().unwrap_or(Err(StoreError::NotFound))
    }

    fn save(&mut self, doc: &RulesDocument) -> Result<(), StoreError> {
        if let Some(e) = self.fail_save {
            return Err(e);
        }
        self.saves.push(doc.clone());
        self.stored = Some(Ok(doc.clone()));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
