//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                |
//! |-------------|-----------------------|----------------------------|
//! | `hardware`  | InputPort, OutputPort | PCA9538 expander bank (I2C)|
//! | `log_sink`  | EventSink             | Serial log output          |
//! | `nvs`       | RulesStore            | NVS / in-memory store      |
//! | `time`      | ClockPort             | ESP32 system timer         |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
