//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! An MQTT or HTTP state adapter would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Render levels as a `0`/`1` string, first entry leftmost.
pub fn bit_string(levels: &[bool]) -> String {
    levels.iter().map(|b| if *b { '1' } else { '0' }).collect()
}

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(s) => {
                info!(
                    "STATE | E={} R={} RES={} | up={}ms",
                    bit_string(&s.inputs),
                    bit_string(&s.relays),
                    bit_string(&s.reserved),
                    s.uptime_ms,
                );
            }
            AppEvent::RelaysChanged(levels) => {
                info!("RELAY | {}", bit_string(levels));
            }
            AppEvent::ShutterMoved { shutter, from, to } => {
                info!("SHUTTER | {} {:?} -> {:?}", shutter, from, to);
            }
            AppEvent::RulesReplaced => {
                info!("RULES | replaced");
            }
            AppEvent::Started {
                inputs,
                relays,
                outcome,
            } => {
                info!("START | inputs={} relays={} rules={:?}", inputs, relays, outcome);
            }
        }
    }
}
