//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the board if the control loop stops feeding it, so a hung loop
//! cannot leave a shutter motor energised past its max-run guard.  The
//! loop calls [`Watchdog::feed`] once per iteration.
//!
//! On host targets every call is a no-op.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

pub struct Watchdog {
    timeout_ms: u32,
    subscribed: bool,
}

impl Watchdog {
    /// Reconfigure the TWDT with `timeout_ms` and subscribe the calling
    /// task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
                } else {
                    warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self {
                    timeout_ms,
                    subscribed,
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {}ms, no-op", timeout_ms);
            if timeout_ms == 0 {
                warn!("Watchdog(sim): zero timeout would fire immediately on target");
            }
            Self {
                timeout_ms,
                subscribed: false,
            }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feed the watchdog.  Must be called more often than the timeout.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_watchdog_is_inert() {
        let wd = Watchdog::new(10_000);
        assert_eq!(wd.timeout_ms(), 10_000);
        assert!(!wd.is_subscribed());
        wd.feed();
    }
}
