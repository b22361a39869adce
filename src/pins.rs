//! GPIO / peripheral pin assignments for the RelayBox main board
//! (ESP32-S3 + W5500 Ethernet + stacked PCA9538 relay modules).
//!
//! Single source of truth: `main.rs` takes the matching `gpioN` peripheral
//! and logs these numbers at boot.

// ---------------------------------------------------------------------------
// I2C bus to the PCA9538 relay/input modules
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// Driven high once the control loop is running.
pub const STATUS_LED_GPIO: i32 = 40;
