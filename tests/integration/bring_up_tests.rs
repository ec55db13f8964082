//! Registration and Service A attribute bring-up.

use ithsble::gatt::events::{GattStatus, GattsEvent, Interface};
use ithsble::gatt::profile::{
    ACTUATOR_CHAR_UUID, AppId, CCCD_UUID, CharacteristicKind, SENSOR_CHAR_UUID, SERVICE_A_NUM_HANDLES,
    SERVICE_A_UUID,
};
use ithsble::gatt::registry::ServicePhase;

use super::mock_stack::*;

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[test]
fn start_registers_both_applications() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();

    assert_eq!(
        h.stack().calls,
        vec![StackCall::RegisterApp(0), StackCall::RegisterApp(1)]
    );
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::Registering);
    assert_eq!(h.peripheral.record(AppId::B).phase, ServicePhase::Registering);
}

#[test]
fn registered_a_creates_service_and_configures_advertising() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    assert_eq!(h.register(A, AppId::A, GattStatus::Ok), 1);

    let stack = h.stack();
    assert!(stack.calls.contains(&StackCall::SetDeviceName("BLE ITHS".into())));
    assert_eq!(
        stack.count(|c| matches!(c, StackCall::ConfigureAdvertising(d) if !d.set_scan_rsp)),
        1
    );
    assert_eq!(
        stack.count(|c| matches!(c, StackCall::ConfigureScanResponse(d) if d.set_scan_rsp)),
        1
    );
    assert!(stack.calls.contains(&StackCall::CreateService {
        interface: IFACE_A,
        uuid: SERVICE_A_UUID,
        num_handles: SERVICE_A_NUM_HANDLES,
    }));
    assert_eq!(h.peripheral.record(AppId::A).interface.map(|i| i.0), Some(IFACE_A));
}

#[test]
fn attributes_are_added_one_at_a_time() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);

    h.service_created();
    let stack = h.stack();
    assert!(stack.calls.contains(&StackCall::StartService(SERVICE_HANDLE)));
    assert_eq!(
        stack.count(|c| matches!(c, StackCall::AddCharacteristic { .. })),
        1,
        "only the sensor characteristic may be in flight"
    );
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::AddingSensor);

    h.characteristic_added(SENSOR_CHAR_UUID, SENSOR_HANDLE, GattStatus::Ok);
    assert_eq!(h.stack().descriptor_requests(), 1);
    assert_eq!(
        h.stack().count(|c| matches!(c, StackCall::AddCharacteristic { .. })),
        1
    );
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::AddingDescriptor);

    h.descriptor_added(GattStatus::Ok);
    assert!(h.stack().calls.contains(&StackCall::AddCharacteristic {
        service_handle: SERVICE_HANDLE,
        uuid: ACTUATOR_CHAR_UUID,
    }));
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::AddingActuator);

    h.characteristic_added(ACTUATOR_CHAR_UUID, ACTUATOR_HANDLE, GattStatus::Ok);
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::Serving);
}

#[test]
fn full_bring_up_records_every_handle() {
    let h = Harness::serving();
    let a = h.peripheral.record(AppId::A);

    assert_eq!(a.service_handle, Some(SERVICE_HANDLE));
    assert_eq!(a.characteristic_handle(CharacteristicKind::Sensor), Some(SENSOR_HANDLE));
    assert_eq!(a.characteristic_handle(CharacteristicKind::Actuator), Some(ACTUATOR_HANDLE));
    assert_eq!(a.descriptor_handle, Some(CCCD_HANDLE));
    assert_eq!(h.peripheral.sensor().handle(), Some(SENSOR_HANDLE));

    assert_eq!(h.stack().descriptor_requests(), 1);
    assert!(h.stack().calls.contains(&StackCall::AddDescriptor {
        service_handle: SERVICE_HANDLE,
        uuid: CCCD_UUID,
    }));
    assert_eq!(h.stack().advertising_starts(), 1);
}

#[test]
fn service_b_registers_without_attributes() {
    let h = Harness::serving();
    let b = h.peripheral.record(AppId::B);

    assert_eq!(b.phase, ServicePhase::Serving);
    assert_eq!(b.interface.map(|i| i.0), Some(IFACE_B));
    assert!(b.service_handle.is_none());
    assert_eq!(
        h.stack().count(|c| matches!(c, StackCall::CreateService { interface, .. } if *interface == IFACE_B)),
        0
    );
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[test]
fn unrouted_events_reach_every_service() {
    let mut h = Harness::serving();
    let delivered = h.gatts(
        Interface::Unrouted,
        GattsEvent::Mtu {
            conn_id: 7,
            mtu: 185,
        },
    );
    assert_eq!(delivered, 2);
}

#[test]
fn bound_events_reach_only_their_owner() {
    let mut h = Harness::serving();
    assert_eq!(h.gatts(B, GattsEvent::Mtu { conn_id: 7, mtu: 185 }), 1);

    let stranger = Interface::Bound(ithsble::gatt::events::GattInterface(9));
    assert_eq!(h.gatts(stranger, GattsEvent::Mtu { conn_id: 7, mtu: 185 }), 0);
}

#[test]
fn registration_without_interface_disables_the_app() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    assert_eq!(h.register(Interface::Unrouted, AppId::A, GattStatus::Ok), 0);

    assert!(h.peripheral.record(AppId::A).is_disabled());
    assert_eq!(h.stack().count(|c| matches!(c, StackCall::CreateService { .. })), 0);
}

#[test]
fn registration_for_unknown_app_is_dropped() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    let delivered = h.gatts(
        A,
        GattsEvent::Registered {
            status: GattStatus::Ok,
            app_id: 7,
        },
    );
    assert_eq!(delivered, 0);
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::Registering);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn failed_registration_disables_only_that_app() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Error);
    h.register(B, AppId::B, GattStatus::Ok);

    assert!(h.peripheral.record(AppId::A).is_disabled());
    assert_eq!(h.peripheral.record(AppId::B).phase, ServicePhase::Serving);
    assert_eq!(h.stack().count(|c| matches!(c, StackCall::CreateService { .. })), 0);
}

#[test]
fn rejected_register_call_is_reported_and_other_app_continues() {
    let mut stack = RecordingStack::default();
    stack.reject.push("register_app");
    let mut h = Harness::with_stack(stack);

    assert!(h.peripheral.start().is_err());
    assert!(h.peripheral.record(AppId::A).is_disabled());
    assert!(h.peripheral.record(AppId::B).is_disabled());
}

#[test]
fn failed_service_creation_disables_service_a() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);
    h.gatts(
        A,
        GattsEvent::ServiceCreated {
            status: GattStatus::Error,
            service_handle: 0,
            service_uuid: SERVICE_A_UUID,
        },
    );

    assert!(h.peripheral.record(AppId::A).is_disabled());
    assert_eq!(h.stack().count(|c| matches!(c, StackCall::StartService(_))), 0);

    // Later completions are dropped.
    h.characteristic_added(SENSOR_CHAR_UUID, SENSOR_HANDLE, GattStatus::Ok);
    assert_eq!(h.stack().descriptor_requests(), 0);
}

#[test]
fn rejected_add_characteristic_call_disables_service_a() {
    let mut stack = RecordingStack::default();
    stack.reject.push("add_characteristic");
    let mut h = Harness::with_stack(stack);
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);
    h.service_created();

    assert!(h.peripheral.record(AppId::A).is_disabled());
}

#[test]
fn failed_descriptor_add_stops_before_actuator() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);
    h.service_created();
    h.characteristic_added(SENSOR_CHAR_UUID, SENSOR_HANDLE, GattStatus::Ok);
    h.descriptor_added(GattStatus::Error);

    assert!(h.peripheral.record(AppId::A).is_disabled());
    assert!(!h.stack().calls.contains(&StackCall::AddCharacteristic {
        service_handle: SERVICE_HANDLE,
        uuid: ACTUATOR_CHAR_UUID,
    }));
}

// ---------------------------------------------------------------------------
// Out-of-order completions
// ---------------------------------------------------------------------------

#[test]
fn completion_for_foreign_service_uuid_is_ignored() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);
    h.gatts(
        A,
        GattsEvent::ServiceCreated {
            status: GattStatus::Ok,
            service_handle: 99,
            service_uuid: 0x1234,
        },
    );

    assert_eq!(h.peripheral.record(AppId::A).service_handle, None);
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::Registering);
}

#[test]
fn actuator_completion_while_adding_sensor_is_ignored() {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);
    h.service_created();
    h.characteristic_added(ACTUATOR_CHAR_UUID, ACTUATOR_HANDLE, GattStatus::Ok);

    let a = h.peripheral.record(AppId::A);
    assert_eq!(a.phase, ServicePhase::AddingSensor);
    assert_eq!(a.characteristic_handle(CharacteristicKind::Actuator), None);
    assert_eq!(h.stack().descriptor_requests(), 0);
}

#[test]
fn duplicate_service_created_is_ignored() {
    let mut h = Harness::serving();
    let before = h.stack().calls.len();
    h.service_created();
    assert_eq!(h.stack().calls.len(), before);
    assert_eq!(h.peripheral.record(AppId::A).phase, ServicePhase::Serving);
}
