//! Peripheral configuration parameters
//!
//! All tunable parameters for the BLE peripheral.
//! Values can be overridden by a postcard blob stored in NVS (`ble/config`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;

/// Advertised device name used when nothing else is configured.
pub const DEFAULT_DEVICE_NAME: &str = "BLE ITHS";

/// Maximum encoded size of a [`BleConfig`] blob.
pub const CONFIG_BLOB_MAX: usize = 96;

/// The publisher feeds the task watchdog once per period.
pub const MAX_PUBLISH_PERIOD_MS: u32 = 5_000;

/// Advertising timing (units of 0.625 ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisingTiming {
    /// Advertising interval lower bound.
    pub interval_min: u16,
    /// Advertising interval upper bound.
    pub interval_max: u16,
    /// Preferred connection interval hint carried in the payload (1.25 ms units).
    pub hint_interval_min: u16,
    pub hint_interval_max: u16,
}

/// Connection-parameter policy requested on every new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPolicy {
    /// Connection interval lower bound (1.25 ms units).
    pub interval_min: u16,
    /// Connection interval upper bound (1.25 ms units).
    pub interval_max: u16,
    /// Peripheral latency in connection events.
    pub latency: u16,
    /// Supervision timeout (10 ms units).
    pub supervision_timeout: u16,
}

/// Core peripheral configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BleConfig {
    /// GAP device name (also included in the advertising payload).
    pub device_name: heapless::String<24>,
    /// Local ATT MTU requested from the stack.
    pub local_mtu: u16,

    // --- Radio policy ---
    pub advertising: AdvertisingTiming,
    pub connection: ConnectionPolicy,

    // --- Tasks ---
    /// Sensor publish period (milliseconds)
    pub publish_period_ms: u32,
    /// Longest time the write handler may wait on a full actuator queue (milliseconds)
    pub actuator_send_timeout_ms: u32,

    // --- Hardware ---
    /// GPIO driven by the actuator task.
    pub actuator_pin: u8,
    /// ADC1 channel sampled by the publisher.
    pub sensor_adc_channel: u8,
}

impl Default for BleConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str(DEFAULT_DEVICE_NAME);
        Self {
            device_name,
            local_mtu: 512,

            advertising: AdvertisingTiming {
                interval_min: 0x20, // 20 ms
                interval_max: 0x40, // 40 ms
                hint_interval_min: 0x0006,
                hint_interval_max: 0x0010,
            },
            connection: ConnectionPolicy {
                interval_min: 0x10, // 20 ms
                interval_max: 0x20, // 40 ms
                latency: 0,
                supervision_timeout: 400, // 4 s
            },

            publish_period_ms: 1000,
            actuator_send_timeout_ms: 20,

            actuator_pin: pins::LED_GPIO,
            sensor_adc_channel: pins::POT_ADC_CHANNEL,
        }
    }
}

impl BleConfig {
    /// Reject values the controller would refuse or that break the task model.
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        if !(23..=517).contains(&self.local_mtu) {
            return Err(Error::Config("local_mtu outside 23..=517"));
        }

        let adv = &self.advertising;
        if !(0x20..=0x4000).contains(&adv.interval_min)
            || !(0x20..=0x4000).contains(&adv.interval_max)
        {
            return Err(Error::Config("advertising interval outside 0x20..=0x4000"));
        }
        if adv.interval_min > adv.interval_max {
            return Err(Error::Config("advertising interval_min > interval_max"));
        }
        if adv.hint_interval_min > adv.hint_interval_max {
            return Err(Error::Config("payload interval hint min > max"));
        }

        let conn = &self.connection;
        if !(0x06..=0x0C80).contains(&conn.interval_min)
            || !(0x06..=0x0C80).contains(&conn.interval_max)
        {
            return Err(Error::Config("connection interval outside 0x06..=0x0C80"));
        }
        if conn.interval_min > conn.interval_max {
            return Err(Error::Config("connection interval_min > interval_max"));
        }
        if conn.latency > 499 {
            return Err(Error::Config("connection latency > 499"));
        }
        if !(0x0A..=0x0C80).contains(&conn.supervision_timeout) {
            return Err(Error::Config("supervision timeout outside 0x0A..=0x0C80"));
        }
        // Link-layer rule: timeout (10 ms) > (1 + latency) * interval_max (1.25 ms) * 2
        let min_timeout_ms = (1 + u32::from(conn.latency)) * u32::from(conn.interval_max) * 5 / 2;
        if u32::from(conn.supervision_timeout) * 10 <= min_timeout_ms {
            return Err(Error::Config("supervision timeout too short for interval/latency"));
        }

        if self.publish_period_ms == 0 {
            return Err(Error::Config("publish_period_ms must be > 0"));
        }
        if self.publish_period_ms > MAX_PUBLISH_PERIOD_MS {
            return Err(Error::Config("publish_period_ms must be <= 5000"));
        }
        if self.actuator_send_timeout_ms > 1000 {
            return Err(Error::Config("actuator_send_timeout_ms must be <= 1000"));
        }
        Ok(())
    }

    pub fn publish_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.publish_period_ms))
    }

    /// Longest the write handler may wait for space in the actuator queue.
    pub fn actuator_send_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.actuator_send_timeout_ms))
    }

    /// Encode as the NVS blob format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes =
            postcard::to_allocvec(self).map_err(|_| Error::Config("config encode failed"))?;
        if bytes.len() > CONFIG_BLOB_MAX {
            return Err(Error::Config("config blob exceeds CONFIG_BLOB_MAX"));
        }
        Ok(bytes)
    }

    /// Decode an NVS blob and validate it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("config blob corrupted"))?;
        config.validate()?;
        Ok(config)
    }
}
