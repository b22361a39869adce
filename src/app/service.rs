//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the decision [`Engine`] and the bookkeeping around
//! it (raw input buffer, last outputs, telemetry cadence).  All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!   InputPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │       AppService       │
//!  OutputPort ◀── │  Engine · Arbitration  │ ◀─▶ RulesStore
//!                 └────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::ControllerConfig;
use crate::engine::{Engine, LoadOutcome, StateSnapshot};
use crate::error::{Result, StoreError};
use crate::shutter::ShutterMove;

use super::channel::{CommandChannel, CommandMsg, ReplyChannel, ReplyMsg};
use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ClockPort, EventSink, InputPort, OutputPort, RulesStore};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    engine: Engine,
    config: ControllerConfig,
    raw_inputs: Vec<bool>,
    last_outputs: Vec<bool>,
    last_motion: Vec<ShutterMove>,
    last_telemetry_ms: Option<u64>,
    tick_count: u64,
}

impl AppService {
    /// Construct the service for the detected I/O counts.
    ///
    /// Runs the default document until [`boot`](Self::boot) loads the
    /// persisted one.
    pub fn new(config: ControllerConfig, input_count: usize, relay_count: usize) -> Self {
        Self {
            engine: Engine::new(input_count, relay_count),
            config,
            raw_inputs: vec![false; input_count],
            last_outputs: vec![false; relay_count],
            last_motion: Vec::new(),
            last_telemetry_ms: None,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted rules document.
    ///
    /// A missing or unreadable document falls back to defaults; an invalid
    /// one keeps its rules but disables every shutter.  Defaults and a
    /// document that had to be resized are written back.
    pub fn boot(&mut self, store: &mut impl RulesStore, sink: &mut impl EventSink) -> LoadOutcome {
        let doc = match store.load() {
            Ok(doc) => Some(doc),
            Err(StoreError::NotFound) => {
                info!("Rules: nothing stored yet (first boot)");
                None
            }
            Err(e) => {
                warn!("Rules: stored document unreadable: {}", e);
                None
            }
        };

        let outcome = self.engine.load_persisted(doc);
        if matches!(outcome, LoadOutcome::Normalized | LoadOutcome::Defaulted) {
            match store.save(&self.engine.document()) {
                Ok(()) => info!("Rules: {:?} document saved", outcome),
                Err(e) => warn!("Rules: {:?} document not saved: {}", outcome, e),
            }
        }

        self.sync_motion();
        sink.emit(&AppEvent::Started {
            inputs: self.engine.input_count(),
            relays: self.engine.relay_count(),
            outcome,
        });
        info!(
            "AppService started: {} inputs, {} relays ({:?})",
            self.engine.input_count(),
            self.engine.relay_count(),
            outcome
        );
        outcome
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: read inputs → engine → write relays.
    ///
    /// The `hw` parameter satisfies **both** [`InputPort`] and
    /// [`OutputPort`]; this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl InputPort + OutputPort),
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now = clock.now_ms();

        // 1. Sample inputs
        hw.read_inputs(&mut self.raw_inputs);

        // 2. Engine cycle
        let outputs = self.engine.tick(&self.raw_inputs, now);

        // 3. Drive relays
        hw.write_relays(outputs);

        // 4. Change events
        if outputs != self.last_outputs.as_slice() {
            self.last_outputs.clear();
            self.last_outputs.extend_from_slice(outputs);
            sink.emit(&AppEvent::RelaysChanged(self.last_outputs.clone()));
        }

        for (idx, shutter) in self.engine.shutters().iter().enumerate() {
            let to = shutter.motion();
            if let Some(from) = self.last_motion.get_mut(idx) {
                if *from != to {
                    sink.emit(&AppEvent::ShutterMoved {
                        shutter: idx + 1,
                        from: *from,
                        to,
                    });
                    *from = to;
                }
            }
        }

        // 5. Periodic telemetry
        let due = self
            .last_telemetry_ms
            .is_none_or(|last| now.saturating_sub(last) >= u64::from(self.config.telemetry_interval_ms));
        if due {
            self.last_telemetry_ms = Some(now);
            sink.emit(&AppEvent::Telemetry(self.engine.snapshot(now)));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an external command.  Rejections leave all state unchanged.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        store: &mut impl RulesStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let result = match &cmd {
            AppCommand::SetOverride { relay, mode } => self.engine.set_override(*relay, *mode),
            AppCommand::ToggleOverride { relay } => self.engine.toggle_override(*relay).map(|_| ()),
            AppCommand::SetManual { shutter, cmd } => self.engine.set_manual(*shutter, *cmd),
            AppCommand::ReplaceRules(doc) => self.replace_rules(doc, store, sink),
        };

        match &result {
            Ok(()) => info!("Command accepted: {:?}", cmd),
            Err(e) => warn!("Command rejected ({}): {:?}", e, cmd),
        }
        result
    }

    /// Drain every queued command, answering each on `replies`.  Returns
    /// how many were processed.
    ///
    /// A reply that does not fit is dropped with a warning; the loop never
    /// blocks on a slow caller.
    pub fn drain_commands(
        &mut self,
        commands: &CommandChannel,
        replies: &ReplyChannel,
        store: &mut impl RulesStore,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut handled = 0;
        while let Ok(CommandMsg { id, cmd }) = commands.try_receive() {
            let result = self.handle_command(cmd, store, sink);
            if replies.try_send(ReplyMsg { id, result }).is_err() {
                warn!("Reply queue full, reply to request {} dropped", id);
            }
            handled += 1;
        }
        handled
    }

    fn replace_rules(
        &mut self,
        doc: &crate::config::RulesDocument,
        store: &mut impl RulesStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let set = self.engine.validate(doc)?;
        store.save(&set.to_document())?;
        self.engine.apply(set);
        self.sync_motion();
        sink.emit(&AppEvent::RulesReplaced);
        Ok(())
    }

    /// Re-size after an expander rescan.  Overrides reset and the default
    /// document is loaded.
    pub fn resize(&mut self, input_count: usize, relay_count: usize) {
        self.engine.resize(input_count, relay_count);
        self.raw_inputs = vec![false; input_count];
        self.last_outputs = vec![false; relay_count];
        self.sync_motion();
    }

    fn sync_motion(&mut self) {
        self.last_motion = self.engine.shutters().iter().map(|s| s.motion()).collect();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn snapshot(&self, now_ms: u64) -> StateSnapshot {
        self.engine.snapshot(now_ms)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
