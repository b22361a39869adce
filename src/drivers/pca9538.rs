//! PCA9538 8-bit I2C I/O expander bank.
//!
//! Each relay module carries one PCA9538: IO0..IO3 drive the four relay
//! coils, IO4..IO7 sample the four opto-isolated inputs.  Modules sit on
//! consecutive addresses from the base address (0x70..0x73 by default).
//!
//! ## Module count
//!
//! [`ExpanderBank::scan`] probes every address and configures responding
//! modules.  The count is the highest responding position + 1, so a gap
//! (e.g. a dead module in slot 2 of 3) keeps the numbering of the modules
//! behind it stable.  With no module at all the count falls back to 1.
//!
//! Absent modules read as all-low and are skipped on write.
//!
//! ## Dual-target design
//!
//! Generic over [`embedded_hal::i2c::I2c`]: the ESP-IDF `I2cDriver` on
//! target, a register mock in tests.

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::error::BusError;

pub const REG_INPUT: u8 = 0x00;
pub const REG_OUTPUT: u8 = 0x01;
pub const REG_POLARITY: u8 = 0x02;
pub const REG_CONFIG: u8 = 0x03;

/// IO0..3 outputs, IO4..7 inputs.
pub const IO_DIRECTION: u8 = 0xF0;

pub const RELAYS_PER_MODULE: usize = 4;
pub const INPUTS_PER_MODULE: usize = 4;

const RELAY_MASK: u8 = 0x0F;
const INPUT_SHIFT: u8 = 4;

#[derive(Debug, Clone, Copy, Default)]
struct Module {
    present: bool,
    /// Last value written to the output register.
    out_cache: u8,
    /// Last successfully read input register.
    in_cache: u8,
}

pub struct ExpanderBank<I2C> {
    i2c: I2C,
    base_addr: u8,
    modules: Vec<Module>,
    module_count: usize,
    active_low: bool,
}

impl<I2C: I2c> ExpanderBank<I2C> {
    pub fn new(i2c: I2C, base_addr: u8, max_modules: u8, active_low: bool) -> Self {
        Self {
            i2c,
            base_addr,
            modules: vec![Module::default(); usize::from(max_modules)],
            module_count: 1,
            active_low,
        }
    }

    /// Probe and configure every module.  Returns the module count.
    pub fn scan(&mut self) -> usize {
        info!(
            "PCA9538: scanning 0x{:02X}..0x{:02X}",
            self.base_addr,
            self.base_addr as usize + self.modules.len().saturating_sub(1)
        );

        let mut last_present = None;
        for m in 0..self.modules.len() {
            let addr = self.addr(m);
            let present = match self.init_module(m) {
                Ok(()) => true,
                Err(BusError::NoAck { .. }) => false,
                Err(e) => {
                    warn!("PCA9538: init 0x{:02X} failed: {}", addr, e);
                    false
                }
            };
            self.modules[m].present = present;
            if present {
                last_present = Some(m);
            }
        }

        self.module_count = last_present.map_or(1, |m| m + 1);
        info!(
            "PCA9538: modules={} (relays={} inputs={})",
            self.module_count,
            self.relay_count(),
            self.input_count()
        );
        self.module_count
    }

    pub fn module_count(&self) -> usize {
        self.module_count
    }

    pub fn relay_count(&self) -> usize {
        self.module_count * RELAYS_PER_MODULE
    }

    pub fn input_count(&self) -> usize {
        self.module_count * INPUTS_PER_MODULE
    }

    pub fn is_present(&self, module: usize) -> bool {
        self.modules.get(module).is_some_and(|m| m.present)
    }

    /// Sample every input into `levels` (index 0 is input 1).
    ///
    /// A module whose read fails keeps its previous sample; the first
    /// failure is returned after all modules were visited.
    pub fn read_inputs(&mut self, levels: &mut [bool]) -> Result<(), BusError> {
        let mut first_err = None;
        for m in 0..self.module_count.min(self.modules.len()) {
            let bits = if self.modules[m].present {
                match self.read_reg(self.addr(m), REG_INPUT) {
                    Ok(v) => {
                        self.modules[m].in_cache = v;
                        v
                    }
                    Err(e) => {
                        first_err.get_or_insert(e);
                        self.modules[m].in_cache
                    }
                }
            } else {
                0
            };

            for i in 0..INPUTS_PER_MODULE {
                if let Some(level) = levels.get_mut(m * INPUTS_PER_MODULE + i) {
                    *level = (bits >> (INPUT_SHIFT + i as u8)) & 1 == 1;
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Drive every relay from `levels` (index 0 is relay 1), honouring the
    /// coil polarity.  Input bits of the output register are preserved.
    pub fn write_relays(&mut self, levels: &[bool]) -> Result<(), BusError> {
        let mut first_err = None;
        for m in 0..self.module_count.min(self.modules.len()) {
            if !self.modules[m].present {
                continue;
            }
            let mut nibble = 0u8;
            for i in 0..RELAYS_PER_MODULE {
                let on = levels.get(m * RELAYS_PER_MODULE + i).copied().unwrap_or(false);
                if on != self.active_low {
                    nibble |= 1 << i;
                }
            }
            let out = (self.modules[m].out_cache & !RELAY_MASK) | nibble;
            self.modules[m].out_cache = out;
            if let Err(e) = self.write_reg(self.addr(m), REG_OUTPUT, out) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Release the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    // ── Internal ──────────────────────────────────────────────

    fn addr(&self, module: usize) -> u8 {
        self.base_addr.wrapping_add(module as u8)
    }

    fn init_module(&mut self, m: usize) -> Result<(), BusError> {
        let addr = self.addr(m);
        // Address probe: a bare register-pointer write must be ACKed.
        self.i2c
            .write(addr, &[REG_INPUT])
            .map_err(|_| BusError::NoAck { addr })?;

        self.write_reg(addr, REG_POLARITY, 0x00)?;
        self.write_reg(addr, REG_CONFIG, IO_DIRECTION)?;

        let off = if self.active_low { RELAY_MASK } else { 0x00 };
        let out = (self.modules[m].out_cache & !RELAY_MASK) | off;
        self.modules[m].out_cache = out;
        self.write_reg(addr, REG_OUTPUT, out)
    }

    fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(addr, &[reg], &mut buf)
            .map_err(|_| BusError::Transfer { addr })?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(addr, &[reg, value])
            .map_err(|_| BusError::Transfer { addr })
    }
}
