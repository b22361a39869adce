//! Peripheral drivers: the relay/input expander bank and the task watchdog.

pub mod pca9538;
pub mod watchdog;
