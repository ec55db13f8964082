//! Worker threads running beside the stack's callback context.
//!
//! - [`actuator`]: consumer end of the actuator bridge.
//! - [`publisher`]: periodic sensor sampling into the sensor characteristic.
//! - [`watchdog`]: TWDT subscription fed by both workers.
//!
//! # ESP-IDF threading model
//!
//! `std::thread` is backed by pthreads, which are thin wrappers around
//! FreeRTOS tasks.  `esp_pthread_set_cfg()` sets thread-local configuration
//! that applies to the *next* `pthread_create()` from the calling thread, so
//! the config→spawn pair must not be interleaved with other thread creation.

pub mod actuator;
pub mod publisher;
pub mod watchdog;

use std::sync::Arc;
use std::thread::JoinHandle;

use log::info;

use crate::app::ports::{ActuatorPort, AttributeStore, SensorPort};
use crate::config::BleConfig;
use crate::error::Error;
use crate::gatt::value::SensorCharacteristic;

use actuator::{ActuatorBridge, run_actuator};
use publisher::{PublisherStop, SensorPublisher};
use watchdog::TaskWatchdog;

/// CPU core identifiers for the ESP32 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): Bluedroid host and controller tasks.
    Pro = 0,
    /// Core 1 (APP_CPU): application tasks.
    App = 1,
}

/// Spawn a thread pinned to `core` with explicit priority and stack.
///
/// `name` must be null-terminated (e.g. `"publisher\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core<T: Send + 'static>(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() -> T + Send + 'static,
) -> Result<JoinHandle<T>, Error> {
    use esp_idf_svc::sys::{ESP_OK, esp_create_default_pthread_config, esp_pthread_set_cfg};

    // SAFETY: the config is consumed by the very next pthread_create on this thread.
    let ret = unsafe {
        let mut cfg = esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr().cast();
        esp_pthread_set_cfg(&cfg)
    };
    if ret != ESP_OK as i32 {
        return Err(Error::Init("esp_pthread_set_cfg failed"));
    }

    let display_name = name.trim_end_matches('\0');
    info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name, core, priority, stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .map_err(|_| Error::Init("thread creation failed"))
}

/// Host threads need more headroom than the firmware budgets (debug builds).
#[cfg(not(target_os = "espidf"))]
const HOST_MIN_STACK: usize = 256 * 1024;

/// Host fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core<T: Send + 'static>(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() -> T + Send + 'static,
) -> Result<JoinHandle<T>, Error> {
    let display_name = name.trim_end_matches('\0');
    info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        display_name, stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size((stack_kb * 1024).max(HOST_MIN_STACK))
        .spawn(f)
        .map_err(|_| Error::Init("thread creation failed"))
}

// ───────────────────────────────────────────────────────────────
// Task set
// ───────────────────────────────────────────────────────────────

const ACTUATOR_PRIORITY: u8 = 5;
const ACTUATOR_STACK_KB: usize = 4;
const PUBLISHER_PRIORITY: u8 = 5;
const PUBLISHER_STACK_KB: usize = 4;

/// Handles to the two worker threads plus their shutdown levers.
pub struct TaskHandles {
    bridge: Arc<ActuatorBridge>,
    publisher_stop: Arc<PublisherStop>,
    actuator: JoinHandle<u32>,
    publisher: JoinHandle<u32>,
}

/// Counters returned by [`TaskHandles::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
    pub commands_applied: u32,
    pub commands_dropped: u32,
    pub publish_ticks: u32,
}

/// Start the actuator consumer and the publisher.
pub fn spawn_tasks<P, A, T>(
    config: &BleConfig,
    bridge: Arc<ActuatorBridge>,
    cell: Arc<SensorCharacteristic>,
    sensor: P,
    attributes: A,
    actuator: T,
) -> Result<TaskHandles, Error>
where
    P: SensorPort + Send + 'static,
    A: AttributeStore + Send + 'static,
    T: ActuatorPort + Send + 'static,
{
    let pin = config.actuator_pin;
    let consumer_bridge = bridge.clone();
    let actuator = spawn_on_core(
        Core::App,
        ACTUATOR_PRIORITY,
        ACTUATOR_STACK_KB,
        "actuator\0",
        move || {
            let mut watchdog = TaskWatchdog::subscribe("actuator");
            run_actuator(consumer_bridge, actuator, pin, &mut watchdog)
        },
    )?;

    let publisher_stop = Arc::new(PublisherStop::new());
    let stop = publisher_stop.clone();
    let publisher = SensorPublisher::new(sensor, attributes, cell, config.publish_period());
    let publisher = match spawn_on_core(
        Core::App,
        PUBLISHER_PRIORITY,
        PUBLISHER_STACK_KB,
        "publisher\0",
        move || {
            let mut watchdog = TaskWatchdog::subscribe("publisher");
            publisher.run(&stop, &mut watchdog)
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            bridge.close();
            return Err(e);
        }
    };

    Ok(TaskHandles {
        bridge,
        publisher_stop,
        actuator,
        publisher,
    })
}

impl TaskHandles {
    /// Close the bridge, stop the publisher and join both threads.
    pub fn shutdown(self) -> Result<TaskReport, Error> {
        info!("TASKS: shutting down");
        self.bridge.close();
        self.publisher_stop.signal(());
        let commands_applied = self
            .actuator
            .join()
            .map_err(|_| Error::Init("actuator task panicked"))?;
        let publish_ticks = self
            .publisher
            .join()
            .map_err(|_| Error::Init("publisher task panicked"))?;
        let report = TaskReport {
            commands_applied,
            commands_dropped: self.bridge.dropped(),
            publish_ticks,
        };
        info!("TASKS: stopped {:?}", report);
        Ok(report)
    }
}
