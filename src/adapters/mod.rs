//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                  | Connects to               |
//! |-------------|-----------------------------|---------------------------|
//! | `bluedroid` | RadioStack, AttributeStore  | ESP-IDF Bluedroid (GATTS) |
//! | `hardware`  | SensorPort                  | ESP32 ADC1 oneshot        |
//! |             | ActuatorPort                | any embedded-hal output   |
//! | `nvs`       | config blob load/save       | NVS / in-memory store     |

#[cfg(target_os = "espidf")]
pub mod bluedroid;
pub mod hardware;
pub mod nvs;
