//! Two-phase advertising gate as seen through the full peripheral.

use ithsble::gatt::advertising::AdvertisingGate;
use ithsble::gatt::events::{GapEvent, GattStatus};
use ithsble::gatt::profile::{AppId, AdvertisingParams};

use super::mock_stack::*;

fn registered() -> Harness {
    let mut h = Harness::new();
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);
    h
}

fn payload_set(h: &mut Harness, status: GattStatus) {
    h.gap(GapEvent::AdvertisingDataSet { status });
}

fn scan_response_set(h: &mut Harness, status: GattStatus) {
    h.gap(GapEvent::ScanResponseDataSet { status });
}

#[test]
fn advertising_waits_for_both_frames() {
    let mut h = registered();
    assert_eq!(h.peripheral.advertising().gate(), AdvertisingGate::WaitingBoth);

    payload_set(&mut h, GattStatus::Ok);
    assert_eq!(h.stack().advertising_starts(), 0);

    scan_response_set(&mut h, GattStatus::Ok);
    assert_eq!(h.stack().advertising_starts(), 1);
    assert!(h.peripheral.advertising().gate().is_ready());
}

#[test]
fn completion_order_does_not_matter() {
    let mut h = registered();
    scan_response_set(&mut h, GattStatus::Ok);
    assert_eq!(h.stack().advertising_starts(), 0);
    payload_set(&mut h, GattStatus::Ok);
    assert_eq!(h.stack().advertising_starts(), 1);
}

#[test]
fn advertising_uses_configured_parameters() {
    let h = Harness::serving();
    let expected = AdvertisingParams::from_config(h.peripheral.config());
    assert!(h.stack().calls.contains(&StackCall::StartAdvertising(expected)));
    assert_eq!(expected.interval_min, 0x20);
    assert_eq!(expected.interval_max, 0x40);
}

#[test]
fn repeated_completions_do_not_restart_advertising() {
    let mut h = Harness::serving();
    payload_set(&mut h, GattStatus::Ok);
    scan_response_set(&mut h, GattStatus::Ok);
    payload_set(&mut h, GattStatus::Ok);

    assert_eq!(h.stack().advertising_starts(), 1);
    assert_eq!(h.peripheral.advertising().starts(), 1);
}

#[test]
fn failed_payload_configuration_blocks_advertising() {
    let mut h = registered();
    payload_set(&mut h, GattStatus::Error);
    scan_response_set(&mut h, GattStatus::Ok);

    assert_eq!(h.stack().advertising_starts(), 0);
    assert_eq!(
        h.peripheral.advertising().gate(),
        AdvertisingGate::WaitingPayload
    );
}

#[test]
fn rejected_configuration_call_blocks_advertising() {
    let mut stack = RecordingStack::default();
    stack.reject.push("configure_scan_response");
    let mut h = Harness::with_stack(stack);
    h.peripheral.start().unwrap();
    h.register(A, AppId::A, GattStatus::Ok);

    // The payload still completes; the scan response never will.
    payload_set(&mut h, GattStatus::Ok);
    assert_eq!(h.stack().advertising_starts(), 0);
}

#[test]
fn start_and_stop_reports_are_consumed_without_side_effects() {
    let mut h = Harness::serving();
    let before = h.stack().calls.len();
    h.gap(GapEvent::AdvertisingStarted {
        status: GattStatus::Ok,
    });
    h.gap(GapEvent::AdvertisingStopped {
        status: GattStatus::Error,
    });
    assert_eq!(h.stack().calls.len(), before);
}

#[test]
fn connection_param_updates_are_only_logged() {
    let mut h = Harness::serving();
    let before = h.stack().calls.len();
    h.gap(GapEvent::ConnectionParamsUpdated {
        status: GattStatus::Ok,
        addr: PEER,
        conn_interval: 0x18,
        latency: 0,
        timeout: 400,
    });
    assert_eq!(h.stack().calls.len(), before);
}
