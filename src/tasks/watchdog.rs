//! Task watchdog (TWDT) for the worker threads.
//!
//! [`configure`] sets the timeout once from `main`; each worker then
//! subscribes its own thread with [`TaskWatchdog::subscribe`] and feeds it
//! once per loop pass.  A worker that stops feeding for longer than
//! [`WATCHDOG_TIMEOUT`] resets the chip.
//!
//! On the host the subscription is simulated and only the feed count is
//! kept, so tests can check that a loop feeds while idle.

use std::time::Duration;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest a subscribed worker blocks between feeds.
pub const FEED_INTERVAL: Duration = Duration::from_secs(2);

/// Apply [`WATCHDOG_TIMEOUT`] to the TWDT, panicking (and rebooting) on expiry.
pub fn configure() {
    #[cfg(target_os = "espidf")]
    {
        let cfg = esp_task_wdt_config_t {
            timeout_ms: WATCHDOG_TIMEOUT.as_millis() as u32,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: cfg outlives the call.
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret == ESP_OK as esp_err_t {
            info!("WDT: timeout {:?}, panic on expiry", WATCHDOG_TIMEOUT);
        } else {
            warn!("WDT: reconfigure returned {} (keeping sdkconfig timeout)", ret);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    info!("WDT(sim): timeout {:?}", WATCHDOG_TIMEOUT);
}

/// Subscription of the calling thread.  Unsubscribes on drop, which must
/// happen on the same thread.
pub struct TaskWatchdog {
    task: &'static str,
    feeds: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl TaskWatchdog {
    pub fn subscribe(task: &'static str) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: a null handle subscribes the calling task.
            let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
            let subscribed = ret == ESP_OK as esp_err_t;
            if subscribed {
                info!("WDT: '{}' subscribed", task);
            } else {
                warn!("WDT: '{}' failed to subscribe ({})", task, ret);
            }
            Self {
                task,
                feeds: 0,
                subscribed,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("WDT(sim): '{}' subscribed", task);
            Self { task, feeds: 0 }
        }
    }

    pub fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: the calling task is subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
        self.feeds = self.feeds.wrapping_add(1);
    }

    pub fn feeds(&self) -> u32 {
        self.feeds
    }
}

impl Drop for TaskWatchdog {
    fn drop(&mut self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: called from the subscribed task.
            unsafe {
                esp_task_wdt_delete(core::ptr::null_mut());
            }
        }
        info!("WDT: '{}' released after {} feed(s)", self.task, self.feeds);
    }
}
