//! BLE ITHS firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  BluedroidStack       AdcSensor      GpioActuator   NVS      │
//! │  (Radio+Attributes)   (SensorPort)   (ActuatorPort) (config) │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        PeripheralService (Bluedroid callback task)     │  │
//! │  │  Registry · Service A/B · Advertising gate             │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  actuator task (bridge consumer) · publisher task (1 Hz)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{error, info};

use ithsble::adapters::bluedroid::{self, BluedroidStack};
use ithsble::adapters::hardware::{AdcSensor, GpioActuator};
use ithsble::adapters::nvs::NvsConfigStore;
use ithsble::app::service::PeripheralService;
use ithsble::gatt::value::SensorCharacteristic;
use ithsble::pins;
use ithsble::tasks::{self, actuator::ActuatorBridge};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("BLE ITHS v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. NVS + config ───────────────────────────────────────
    let nvs = NvsConfigStore::new().map_err(|e| anyhow!("{e}"))?;
    let config = nvs.load();
    info!("Config: {:?}", config);

    // ── 3. Hardware ───────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    if config.actuator_pin != pins::LED_GPIO {
        error!(
            "actuator_pin={} not wired on this board, using GPIO{}",
            config.actuator_pin,
            pins::LED_GPIO
        );
    }
    let led = PinDriver::output(peripherals.pins.gpio2)?;
    let actuator = GpioActuator::new(pins::LED_GPIO, led);
    let sensor = AdcSensor::new(config.sensor_adc_channel).map_err(|e| anyhow!("{e}"))?;

    // ── 4. Shared halves of the task channels ─────────────────
    let bridge = Arc::new(ActuatorBridge::new());
    let cell = Arc::new(SensorCharacteristic::new());

    // ── 5. Radio bring-up + peripheral ────────────────────────
    let _bt = bluedroid::init(peripherals.modem, config.local_mtu).map_err(|e| anyhow!("{e}"))?;
    let mut task_config = config.clone();
    task_config.actuator_pin = pins::LED_GPIO;
    bluedroid::install(PeripheralService::new(
        BluedroidStack,
        config,
        bridge.clone(),
        cell.clone(),
    ));
    match bluedroid::with_peripheral(|svc| svc.start()) {
        Some(Ok(())) => info!("Applications registered"),
        Some(Err(e)) => error!("Registration incomplete: {}", e),
        None => return Err(anyhow!("peripheral not installed")),
    }

    // ── 6. Worker tasks ───────────────────────────────────────
    tasks::watchdog::configure();
    let _tasks = tasks::spawn_tasks(&task_config, bridge, cell, sensor, BluedroidStack, actuator)
        .map_err(|e| anyhow!("{e}"))?;

    info!("System ready.");

    // ── 7. Idle: everything else is callback- or task-driven ──
    loop {
        std::thread::sleep(Duration::from_secs(60));
        if let Some(stats) = bluedroid::with_peripheral(|svc| {
            (
                svc.advertising().starts(),
                svc.actuator().dropped(),
                svc.sensor().samples(),
            )
        }) {
            info!(
                "stats: adv_starts={} cmds_dropped={} samples={}",
                stats.0, stats.1, stats.2
            );
        }
    }
}
