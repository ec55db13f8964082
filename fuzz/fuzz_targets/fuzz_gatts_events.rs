//! Fuzz target: GATTS event dispatch on a served peripheral
//!
//! Brings the peripheral up against a null stack, then replays arbitrary
//! read / write / connect / disconnect events decoded from the input.
//!
//! Invariants checked:
//! - No panics under any event sequence
//! - The actuator queue never exceeds its capacity
//! - A served Service A is never disabled by peer traffic
//!
//! cargo fuzz run fuzz_gatts_events

#![no_main]

use std::sync::Arc;

use ithsble::app::ports::RadioStack;
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
use libfuzzer_sys::fuzz_target;

// ── Null stack: accepts every request ─────────────────────────

struct NullStack;

impl RadioStack for NullStack {
    fn register_app(&mut self, _: u16) -> Result<(), StackError> {
        Ok(())
    }
    fn set_device_name(&mut self, _: &str) -> Result<(), StackError> {
        Ok(())
    }
    fn configure_advertising(&mut self, _: &AdvertisingData) -> Result<(), StackError> {
        Ok(())
    }
    fn configure_scan_response(&mut self, _: &AdvertisingData) -> Result<(), StackError> {
        Ok(())
    }
    fn create_service(&mut self, _: GattInterface, _: &ServiceDef) -> Result<(), StackError> {
        Ok(())
    }
    fn start_service(&mut self, _: u16) -> Result<(), StackError> {
        Ok(())
    }
    fn add_characteristic(&mut self, _: u16, _: &CharacteristicDef) -> Result<(), StackError> {
        Ok(())
    }
    fn add_descriptor(&mut self, _: u16, _: &DescriptorDef) -> Result<(), StackError> {
        Ok(())
    }
    fn send_read_response(
        &mut self,
        _: GattInterface,
        _: u16,
        _: u32,
        _: GattStatus,
        _: u16,
        _: &[u8],
    ) -> Result<(), StackError> {
        Ok(())
    }
    fn send_write_response(&mut self, _: GattInterface, _: u16, _: u32, _: GattStatus) -> Result<(), StackError> {
        Ok(())
    }
    fn start_advertising(&mut self, _: &AdvertisingParams) -> Result<(), StackError> {
        Ok(())
    }
    fn update_conn_params(&mut self, _: &ConnParams) -> Result<(), StackError> {
        Ok(())
    }
}

const A: Interface = Interface::Bound(GattInterface(3));

fn served() -> PeripheralService<NullStack> {
    let config = BleConfig {
        // Never block the fuzzer on a full queue.
        actuator_send_timeout_ms: 0,
        ..BleConfig::default()
    };
    let mut p = PeripheralService::new(
        NullStack,
        config,
        Arc::new(ActuatorBridge::new()),
        Arc::new(SensorCharacteristic::new()),
    );
    let _ = p.start();
    let bring_up = [
        GattsEvent::Registered {
            status: GattStatus::Ok,
            app_id: AppId::A.raw(),
        },
        GattsEvent::ServiceCreated {
            status: GattStatus::Ok,
            service_handle: 40,
            service_uuid: SERVICE_A_UUID,
        },
        GattsEvent::CharacteristicAdded {
            status: GattStatus::Ok,
            attr_handle: 42,
            service_handle: 40,
            char_uuid: SENSOR_CHAR_UUID,
        },
        GattsEvent::DescriptorAdded {
            status: GattStatus::Ok,
            attr_handle: 43,
            service_handle: 40,
            descr_uuid: CCCD_UUID,
        },
        GattsEvent::CharacteristicAdded {
            status: GattStatus::Ok,
            attr_handle: 44,
            service_handle: 40,
            char_uuid: ACTUATOR_CHAR_UUID,
        },
    ];
    for event in &bring_up {
        p.on_gatts_event(A, event);
    }
    p.on_gap_event(&GapEvent::AdvertisingDataSet { status: GattStatus::Ok });
    p.on_gap_event(&GapEvent::ScanResponseDataSet { status: GattStatus::Ok });
    p
}

fuzz_target!(|data: &[u8]| {
    let mut p = served();
    let mut rest = data;

    while let [op, handle_lo, len, tail @ ..] = rest {
        let handle = 40 + u16::from(*handle_lo % 8);
        let len = usize::from(*len % 8).min(tail.len());
        let (value, next) = tail.split_at(len);
        rest = next;

        let conn_id = u16::from(op >> 4);
        let event = match op % 6 {
            0 => GattsEvent::Read {
                conn_id,
                trans_id: 1,
                handle,
                offset: 0,
                need_rsp: op & 0x08 != 0,
            },
            1 | 2 => GattsEvent::Write {
                conn_id,
                trans_id: 2,
                handle,
                offset: 0,
                need_rsp: op & 0x08 != 0,
                is_prep: op & 0x40 != 0,
                value,
            },
            3 => GattsEvent::PeerConnected {
                conn_id,
                addr: BdAddr([*handle_lo; 6]),
            },
            4 => GattsEvent::PeerDisconnected {
                conn_id,
                addr: BdAddr::default(),
                reason: 0x13,
            },
            _ => GattsEvent::Mtu {
                conn_id,
                mtu: 23 + u16::from(*handle_lo),
            },
        };
        let interface = if op & 0x80 != 0 { Interface::Unrouted } else { A };
        p.on_gatts_event(interface, &event);

        assert!(p.actuator().len() <= ActuatorBridge::<10>::CAPACITY);
        assert!(!p.record(AppId::A).is_disabled());
    }
});
