//! RelayBox Firmware: Main Entry Point
//!
//! Hexagonal architecture around a fixed-rate control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    LogEventSink   NvsAdapter    Esp32Clock    │
//! │  (Input+Output)     (EventSink)    (RulesStore)  (ClockPort)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Rules · Shutters · Arbitration                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  COMMANDS / REPLIES channels ◀──▶ network tasks (HTTP / MQTT)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::info;

use relaybox::adapters::hardware::HardwareAdapter;
use relaybox::adapters::log_sink::LogEventSink;
use relaybox::adapters::nvs::NvsAdapter;
use relaybox::adapters::time::Esp32Clock;
use relaybox::app::channel::{COMMANDS, REPLIES};
use relaybox::app::service::AppService;
use relaybox::config::ControllerConfig;
use relaybox::drivers::pca9538::ExpanderBank;
use relaybox::drivers::watchdog::Watchdog;
use relaybox::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RelayBox v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = ControllerConfig::default();
    let peripherals = Peripherals::take()?;

    let mut led = PinDriver::output(peripherals.pins.gpio40)?;
    led.set_low()?;

    // ── 2. I2C bus + expander scan ────────────────────────────
    info!(
        "I2C: SDA={} SCL={} @ {} Hz",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        config.i2c_freq_hz
    );
    let i2c_cfg = I2cConfig::new().baudrate(Hertz(config.i2c_freq_hz));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &i2c_cfg,
    )?;

    let mut bank = ExpanderBank::new(
        i2c,
        config.expander_base_addr,
        config.max_modules,
        config.relay_active_low,
    );
    bank.scan();
    let (inputs, relays) = (bank.input_count(), bank.relay_count());
    let mut hw = HardwareAdapter::new(bank);

    // ── 3. Rules from NVS (or defaults) ───────────────────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {e}"))?;

    let clock = Esp32Clock::new();
    let mut sink = LogEventSink::new();
    let mut app = AppService::new(config.clone(), inputs, relays);
    app.boot(&mut nvs, &mut sink);

    let watchdog = Watchdog::new(config.watchdog_timeout_ms);
    led.set_high()?;
    info!("System ready. Entering control loop ({} ms).", config.loop_interval_ms);

    // ── 4. Control loop ───────────────────────────────────────
    loop {
        // Commands are applied strictly between ticks.
        app.drain_commands(&COMMANDS, &REPLIES, &mut nvs, &mut sink);
        app.tick(&mut hw, &clock, &mut sink);

        watchdog.feed();
        FreeRtos::delay_ms(config.loop_interval_ms);
    }
}
