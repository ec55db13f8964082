//! Hardware adapters: bridge real peripherals to the domain port traits.
//!
//! - [`AdcSensor`]: ADC1 oneshot channel behind [`SensorPort`].
//! - [`GpioActuator`]: any `embedded_hal` output pin behind [`ActuatorPort`].
//!
//! On non-espidf targets the ADC uses a simulation stub.

use embedded_hal::digital::OutputPin;
use log::{error, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::app::ports::{ActuatorPort, SensorPort};
#[cfg(target_os = "espidf")]
use crate::error::Error;

// ── ADC (oneshot) ─────────────────────────────────────────────

/// Potentiometer on an ADC1 channel, 12-bit, 12 dB attenuation.
pub struct AdcSensor {
    channel: u8,
    #[cfg(target_os = "espidf")]
    handle: adc_oneshot_unit_handle_t,
    #[cfg(not(target_os = "espidf"))]
    sim_raw: u32,
}

// SAFETY: the unit handle is used only by the thread that owns the sensor.
#[cfg(target_os = "espidf")]
unsafe impl Send for AdcSensor {}

impl AdcSensor {
    #[cfg(target_os = "espidf")]
    pub fn new(channel: u8) -> Result<Self, Error> {
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: init_cfg and handle outlive the call.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut handle) };
        if ret != ESP_OK as i32 {
            error!("ADC1 init failed (rc={})", ret);
            return Err(Error::Init("ADC1 unit init failed"));
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: handle was just created.
        let ret = unsafe { adc_oneshot_config_channel(handle, adc_channel_t::from(channel), &chan_cfg) };
        if ret != ESP_OK as i32 {
            error!("ADC1 channel {} config failed (rc={})", channel, ret);
            return Err(Error::Init("ADC1 channel config failed"));
        }
        log::info!("ADC1 channel {} configured", channel);
        Ok(Self { channel, handle })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(channel: u8) -> Self {
        Self { channel, sim_raw: 0 }
    }

    /// Simulation: value returned by the next reads.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_raw(&mut self, raw: u32) {
        self.sim_raw = raw;
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

impl SensorPort for AdcSensor {
    #[cfg(target_os = "espidf")]
    fn read_analog(&mut self) -> u32 {
        let mut raw: i32 = 0;
        // SAFETY: handle is valid for the sensor's lifetime; single owner.
        let ret = unsafe { adc_oneshot_read(self.handle, adc_channel_t::from(self.channel), &mut raw) };
        if ret != ESP_OK as i32 {
            warn!("ADC1 ch{} read failed (rc={})", self.channel, ret);
            return 0;
        }
        raw.max(0) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_analog(&mut self) -> u32 {
        self.sim_raw
    }
}

// ── GPIO output ───────────────────────────────────────────────

/// Single digital output driven by actuator commands.
pub struct GpioActuator<P: OutputPin> {
    pin_number: u8,
    pin: P,
}

impl<P: OutputPin> GpioActuator<P> {
    pub fn new(pin_number: u8, pin: P) -> Self {
        Self { pin_number, pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> ActuatorPort for GpioActuator<P> {
    fn set_digital_output(&mut self, pin: u8, level: bool) {
        if pin != self.pin_number {
            warn!("GPIO{} not owned by this actuator (owns GPIO{})", pin, self.pin_number);
            return;
        }
        let result = if level {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            error!("GPIO{} write failed: {:?}", pin, e);
        }
    }
}
