//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PeripheralService (domain)
//! ```
//!
//! Driven adapters (radio stack, ADC, GPIO) implement these traits.  The
//! [`PeripheralService`](super::service::PeripheralService) and the two
//! tasks consume them via generics, so the domain core never touches the
//! radio or the hardware directly.

use crate::error::StackError;
use crate::gatt::events::{GattInterface, GattStatus};
use crate::gatt::profile::{
    AdvertisingData, AdvertisingParams, CharacteristicDef, ConnParams, DescriptorDef, ServiceDef,
};

// ───────────────────────────────────────────────────────────────
// Radio stack control surface (driven adapter: domain → radio)
// ───────────────────────────────────────────────────────────────

/// Control calls issued from the stack's callback context.
///
/// Every call is fire-and-forget: `Ok(())` only means the request was
/// accepted.  Completion is observed through the next
/// [`GattsEvent`](crate::gatt::events::GattsEvent) or
/// [`GapEvent`](crate::gatt::events::GapEvent).
pub trait RadioStack {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError>;

    fn set_device_name(&mut self, name: &str) -> Result<(), StackError>;

    /// Configure the primary advertising payload.
    fn configure_advertising(&mut self, data: &AdvertisingData) -> Result<(), StackError>;

    /// Configure the scan-response payload.
    fn configure_scan_response(&mut self, data: &AdvertisingData) -> Result<(), StackError>;

    fn create_service(
        &mut self,
        interface: GattInterface,
        service: &ServiceDef,
    ) -> Result<(), StackError>;

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError>;

    fn add_characteristic(
        &mut self,
        service_handle: u16,
        characteristic: &CharacteristicDef,
    ) -> Result<(), StackError>;

    /// Add a descriptor to the most recently added characteristic.
    fn add_descriptor(
        &mut self,
        service_handle: u16,
        descriptor: &DescriptorDef,
    ) -> Result<(), StackError>;

    fn send_read_response(
        &mut self,
        interface: GattInterface,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError>;

    fn send_write_response(
        &mut self,
        interface: GattInterface,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
    ) -> Result<(), StackError>;

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), StackError>;

    fn update_conn_params(&mut self, params: &ConnParams) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Attribute table (driven adapter: publisher → radio)
// ───────────────────────────────────────────────────────────────

/// Write access to the stack's attribute table.
///
/// Called from the publisher task, not the callback context, so
/// implementations must be safe to use from another thread.
pub trait AttributeStore {
    fn set_attribute_value(&mut self, handle: u16, value: &[u8]) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the publisher calls this once per tick.
pub trait SensorPort {
    /// Raw analog sample (12-bit on ESP32 ADC1).
    fn read_analog(&mut self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the actuator task calls this for every command.
pub trait ActuatorPort {
    fn set_digital_output(&mut self, pin: u8, level: bool);
}
