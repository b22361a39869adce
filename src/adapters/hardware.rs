//! Hardware adapter: bridges the expander bank to the domain port traits.
//!
//! Owns the [`ExpanderBank`] and exposes it through [`InputPort`] and
//! [`OutputPort`].  Bus errors never reach the engine: a failed read keeps
//! the previous sample, a failed write is retried on the next cycle.  Each
//! error kind is logged once per burst rather than every 10 ms.

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::{InputPort, OutputPort};
use crate::drivers::pca9538::ExpanderBank;
use crate::error::BusError;

pub struct HardwareAdapter<I2C> {
    bank: ExpanderBank<I2C>,
    read_fault: Option<BusError>,
    write_fault: Option<BusError>,
}

impl<I2C: I2c> HardwareAdapter<I2C> {
    pub fn new(bank: ExpanderBank<I2C>) -> Self {
        Self {
            bank,
            read_fault: None,
            write_fault: None,
        }
    }

    pub fn bank(&self) -> &ExpanderBank<I2C> {
        &self.bank
    }

    fn track(slot: &mut Option<BusError>, what: &str, result: Result<(), BusError>) {
        match (result, *slot) {
            (Ok(()), Some(prev)) => {
                info!("Expander {}: recovered after {}", what, prev);
                *slot = None;
            }
            (Err(e), None) => {
                warn!("Expander {}: {}", what, e);
                *slot = Some(e);
            }
            _ => {}
        }
    }
}

// ── InputPort implementation ──────────────────────────────────

impl<I2C: I2c> InputPort for HardwareAdapter<I2C> {
    fn read_inputs(&mut self, levels: &mut [bool]) {
        let result = self.bank.read_inputs(levels);
        Self::track(&mut self.read_fault, "read", result);
    }
}

// ── OutputPort implementation ─────────────────────────────────

impl<I2C: I2c> OutputPort for HardwareAdapter<I2C> {
    fn write_relays(&mut self, levels: &[bool]) {
        let result = self.bank.write_relays(levels);
        Self::track(&mut self.write_fault, "write", result);
    }
}
