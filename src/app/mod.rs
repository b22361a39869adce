//! Application core: engine orchestration, zero direct I/O.
//!
//! The [`service::AppService`] wraps the decision [`Engine`](crate::engine::Engine)
//! with the per-cycle read/write loop, boot-time configuration loading and
//! the command surface.  All interaction with hardware and storage happens
//! through the **port traits** in [`ports`], so this layer is fully testable
//! without real peripherals.

pub mod channel;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
