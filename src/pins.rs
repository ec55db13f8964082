//! GPIO / peripheral pin assignments for the ESP32 DevKit board.
//!
//! Single source of truth: drivers and the default configuration reference
//! this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// Digital output driving the on-board LED (active HIGH).
pub const LED_GPIO: u8 = 2;

// ---------------------------------------------------------------------------
// Sensor: analog (ADC1)
// ---------------------------------------------------------------------------

/// Potentiometer wiper, ADC1 channel 6 (GPIO 34 on ESP32).
pub const POT_ADC_CHANNEL: u8 = 6;
