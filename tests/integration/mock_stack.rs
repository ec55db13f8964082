//! Mock radio stack and hardware for integration tests.
//!
//! [`RecordingStack`] records every control call so tests can assert on
//! the full request history, and can be told to reject specific calls.
//! [`Harness`] wires a [`PeripheralService`] to it and knows the handle
//! numbers a typical Bluedroid bring-up hands out.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use ithsble::app::ports::{ActuatorPort, AttributeStore, RadioStack, SensorPort};
use ithsble::app::service::PeripheralService;
use ithsble::config::BleConfig;
use ithsble::error::StackError;
use ithsble::gatt::events::{BdAddr, GapEvent, GattInterface, GattStatus, GattsEvent, Interface};
use ithsble::gatt::profile::{
    ACTUATOR_CHAR_UUID, AdvertisingData, AdvertisingParams, AppId, CCCD_UUID, CharacteristicDef,
    ConnParams, DescriptorDef, SENSOR_CHAR_UUID, SERVICE_A_UUID, ServiceDef,
};
use ithsble::gatt::value::SensorCharacteristic;
use ithsble::tasks::actuator::ActuatorBridge;

// ── Stack call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StackCall {
    RegisterApp(u16),
    SetDeviceName(String),
    ConfigureAdvertising(AdvertisingData),
    ConfigureScanResponse(AdvertisingData),
    CreateService {
        interface: u8,
        uuid: u16,
        num_handles: u16,
    },
    StartService(u16),
    AddCharacteristic {
        service_handle: u16,
        uuid: u16,
    },
    AddDescriptor {
        service_handle: u16,
        uuid: u16,
    },
    ReadResponse {
        interface: u8,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        handle: u16,
        value: Vec<u8>,
    },
    WriteResponse {
        interface: u8,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
    },
    StartAdvertising(AdvertisingParams),
    UpdateConnParams(ConnParams),
}

// ── RecordingStack ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingStack {
    pub calls: Vec<StackCall>,
    /// Control calls (by name) that return an error instead of recording.
    pub reject: Vec<&'static str>,
}

#[allow(dead_code)]
impl RecordingStack {
    fn gate(&self, call: &'static str) -> Result<(), StackError> {
        if self.reject.contains(&call) {
            Err(StackError::new(call, -1))
        } else {
            Ok(())
        }
    }

    pub fn count(&self, pred: impl Fn(&StackCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn position(&self, pred: impl Fn(&StackCall) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    pub fn advertising_starts(&self) -> usize {
        self.count(|c| matches!(c, StackCall::StartAdvertising(_)))
    }

    pub fn descriptor_requests(&self) -> usize {
        self.count(|c| matches!(c, StackCall::AddDescriptor { .. }))
    }

    pub fn write_responses(&self) -> Vec<GattStatus> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StackCall::WriteResponse { status, .. } => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub fn last_read_response(&self) -> Option<(GattStatus, Vec<u8>)> {
        self.calls.iter().rev().find_map(|c| match c {
            StackCall::ReadResponse { status, value, .. } => Some((*status, value.clone())),
            _ => None,
        })
    }
}

impl RadioStack for RecordingStack {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError> {
        self.gate("register_app")?;
        self.calls.push(StackCall::RegisterApp(app_id));
        Ok(())
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        self.gate("set_device_name")?;
        self.calls.push(StackCall::SetDeviceName(name.to_string()));
        Ok(())
    }

    fn configure_advertising(&mut self, data: &AdvertisingData) -> Result<(), StackError> {
        self.gate("configure_advertising")?;
        self.calls.push(StackCall::ConfigureAdvertising(*data));
        Ok(())
    }

    fn configure_scan_response(&mut self, data: &AdvertisingData) -> Result<(), StackError> {
        self.gate("configure_scan_response")?;
        self.calls.push(StackCall::ConfigureScanResponse(*data));
        Ok(())
    }

    fn create_service(&mut self, interface: GattInterface, service: &ServiceDef) -> Result<(), StackError> {
        self.gate("create_service")?;
        self.calls.push(StackCall::CreateService {
            interface: interface.0,
            uuid: service.uuid,
            num_handles: service.num_handles,
        });
        Ok(())
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError> {
        self.gate("start_service")?;
        self.calls.push(StackCall::StartService(service_handle));
        Ok(())
    }

    fn add_characteristic(
        &mut self,
        service_handle: u16,
        characteristic: &CharacteristicDef,
    ) -> Result<(), StackError> {
        self.gate("add_characteristic")?;
        self.calls.push(StackCall::AddCharacteristic {
            service_handle,
            uuid: characteristic.uuid,
        });
        Ok(())
    }

    fn add_descriptor(&mut self, service_handle: u16, descriptor: &DescriptorDef) -> Result<(), StackError> {
        self.gate("add_descriptor")?;
        self.calls.push(StackCall::AddDescriptor {
            service_handle,
            uuid: descriptor.uuid,
        });
        Ok(())
    }

    fn send_read_response(
        &mut self,
        interface: GattInterface,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        handle: u16,
        value: &[u8],
    ) -> Result<(), StackError> {
        self.gate("send_read_response")?;
        self.calls.push(StackCall::ReadResponse {
            interface: interface.0,
            conn_id,
            trans_id,
            status,
            handle,
            value: value.to_vec(),
        });
        Ok(())
    }

    fn send_write_response(
        &mut self,
        interface: GattInterface,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
    ) -> Result<(), StackError> {
        self.gate("send_write_response")?;
        self.calls.push(StackCall::WriteResponse {
            interface: interface.0,
            conn_id,
            trans_id,
            status,
        });
        Ok(())
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), StackError> {
        self.gate("start_advertising")?;
        self.calls.push(StackCall::StartAdvertising(*params));
        Ok(())
    }

    fn update_conn_params(&mut self, params: &ConnParams) -> Result<(), StackError> {
        self.gate("update_conn_params")?;
        self.calls.push(StackCall::UpdateConnParams(*params));
        Ok(())
    }
}

// ── Hardware mocks (Send, shareable with worker threads) ──────

#[derive(Clone, Default)]
pub struct MockSensor {
    pub raw: Arc<AtomicU32>,
}

impl SensorPort for MockSensor {
    fn read_analog(&mut self) -> u32 {
        self.raw.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Default)]
pub struct MockActuator {
    pub applied: Arc<Mutex<Vec<(u8, bool)>>>,
}

#[allow(dead_code)]
impl MockActuator {
    pub fn levels(&self) -> Vec<bool> {
        self.applied.lock().unwrap().iter().map(|(_, l)| *l).collect()
    }
}

impl ActuatorPort for MockActuator {
    fn set_digital_output(&mut self, pin: u8, level: bool) {
        self.applied.lock().unwrap().push((pin, level));
    }
}

#[derive(Clone, Default)]
pub struct MockAttributes {
    pub writes: Arc<Mutex<Vec<(u16, Vec<u8>)>>>,
}

impl AttributeStore for MockAttributes {
    fn set_attribute_value(&mut self, handle: u16, value: &[u8]) -> Result<(), StackError> {
        self.writes.lock().unwrap().push((handle, value.to_vec()));
        Ok(())
    }
}

// ── Harness ───────────────────────────────────────────────────

pub const IFACE_A: u8 = 3;
pub const IFACE_B: u8 = 4;
pub const SERVICE_HANDLE: u16 = 40;
pub const SENSOR_HANDLE: u16 = 42;
pub const CCCD_HANDLE: u16 = 43;
pub const ACTUATOR_HANDLE: u16 = 45;
pub const PEER: BdAddr = BdAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

pub const A: Interface = Interface::Bound(GattInterface(IFACE_A));
pub const B: Interface = Interface::Bound(GattInterface(IFACE_B));

pub struct Harness {
    pub peripheral: PeripheralService<RecordingStack>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_stack(RecordingStack::default())
    }

    pub fn with_stack(stack: RecordingStack) -> Self {
        Self::with_parts(stack, Arc::new(ActuatorBridge::new()))
    }

    pub fn with_parts(stack: RecordingStack, bridge: Arc<ActuatorBridge>) -> Self {
        Self {
            peripheral: PeripheralService::new(
                stack,
                BleConfig::default(),
                bridge,
                Arc::new(SensorCharacteristic::new()),
            ),
        }
    }

    /// Fully brought-up peripheral: both apps registered, service A serving,
    /// advertising started.
    pub fn serving() -> Self {
        let mut h = Self::new();
        h.bring_up();
        h
    }

    pub fn stack(&self) -> &RecordingStack {
        self.peripheral.stack()
    }

    pub fn gatts(&mut self, interface: Interface, event: GattsEvent<'_>) -> usize {
        self.peripheral.on_gatts_event(interface, &event)
    }

    pub fn gap(&mut self, event: GapEvent) {
        self.peripheral.on_gap_event(&event);
    }

    pub fn register(&mut self, interface: Interface, app_id: AppId, status: GattStatus) -> usize {
        self.gatts(
            interface,
            GattsEvent::Registered {
                status,
                app_id: app_id.raw(),
            },
        )
    }

    pub fn service_created(&mut self) -> usize {
        self.gatts(
            A,
            GattsEvent::ServiceCreated {
                status: GattStatus::Ok,
                service_handle: SERVICE_HANDLE,
                service_uuid: SERVICE_A_UUID,
            },
        )
    }

    pub fn characteristic_added(&mut self, uuid: u16, handle: u16, status: GattStatus) -> usize {
        self.gatts(
            A,
            GattsEvent::CharacteristicAdded {
                status,
                attr_handle: handle,
                service_handle: SERVICE_HANDLE,
                char_uuid: uuid,
            },
        )
    }

    pub fn descriptor_added(&mut self, status: GattStatus) -> usize {
        self.gatts(
            A,
            GattsEvent::DescriptorAdded {
                status,
                attr_handle: CCCD_HANDLE,
                service_handle: SERVICE_HANDLE,
                descr_uuid: CCCD_UUID,
            },
        )
    }

    pub fn bring_up(&mut self) {
        self.peripheral.start().unwrap();
        self.register(A, AppId::A, GattStatus::Ok);
        self.register(B, AppId::B, GattStatus::Ok);
        self.service_created();
        self.characteristic_added(SENSOR_CHAR_UUID, SENSOR_HANDLE, GattStatus::Ok);
        self.descriptor_added(GattStatus::Ok);
        self.characteristic_added(ACTUATOR_CHAR_UUID, ACTUATOR_HANDLE, GattStatus::Ok);
        self.gap(GapEvent::AdvertisingDataSet {
            status: GattStatus::Ok,
        });
        self.gap(GapEvent::ScanResponseDataSet {
            status: GattStatus::Ok,
        });
    }

    pub fn connect(&mut self, conn_id: u16, addr: BdAddr) -> usize {
        self.gatts(A, GattsEvent::PeerConnected { conn_id, addr })
    }

    pub fn disconnect(&mut self, conn_id: u16) -> usize {
        self.gatts(
            A,
            GattsEvent::PeerDisconnected {
                conn_id,
                addr: PEER,
                reason: 0x13,
            },
        )
    }

    pub fn write(&mut self, handle: u16, value: &[u8], need_rsp: bool) -> usize {
        self.gatts(
            A,
            GattsEvent::Write {
                conn_id: 7,
                trans_id: 100,
                handle,
                offset: 0,
                need_rsp,
                is_prep: false,
                value,
            },
        )
    }

    pub fn read(&mut self, handle: u16) -> usize {
        self.gatts(
            A,
            GattsEvent::Read {
                conn_id: 7,
                trans_id: 200,
                handle,
                offset: 0,
                need_rsp: true,
            },
        )
    }
}
