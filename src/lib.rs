//! RelayBox firmware library.
//!
//! The decision engine (rules, shutter interlocks, arbitration) and the
//! hardware-agnostic application layer, exposed for integration testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod rules;
pub mod safety;
pub mod shutter;

pub mod adapters;
pub mod drivers;
pub mod pins;
