//! Worker tasks driven end to end: GATT write -> bridge -> actuator thread,
//! sensor -> publisher thread -> attribute table.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use ithsble::config::BleConfig;
use ithsble::gatt::value::{SensorCharacteristic, pack_sample};
use ithsble::pins;
use ithsble::tasks::{self, actuator::ActuatorBridge};

use super::mock_stack::*;

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn fast_config() -> BleConfig {
    BleConfig {
        publish_period_ms: 10,
        ..BleConfig::default()
    }
}

#[test]
fn written_commands_reach_the_actuator_in_order() {
    let bridge = Arc::new(ActuatorBridge::new());
    let cell = Arc::new(SensorCharacteristic::new());
    let actuator = MockActuator::default();
    let mut h = Harness::with_parts(RecordingStack::default(), bridge.clone());
    h.bring_up();

    let handles = tasks::spawn_tasks(
        &fast_config(),
        bridge,
        cell,
        MockSensor::default(),
        MockAttributes::default(),
        actuator.clone(),
    )
    .unwrap();

    for cmd in [0x01, 0x00, 0x01] {
        h.write(ACTUATOR_HANDLE, &[cmd], true);
    }
    assert!(wait_until(Duration::from_secs(2), || actuator.levels().len() == 3));

    let report = handles.shutdown().unwrap();
    assert_eq!(report.commands_applied, 3);
    assert_eq!(report.commands_dropped, 0);
    assert_eq!(actuator.levels(), vec![true, false, true]);
    assert!(actuator
        .applied
        .lock()
        .unwrap()
        .iter()
        .all(|(pin, _)| *pin == pins::LED_GPIO));
}

#[test]
fn publisher_pushes_samples_once_the_handle_is_bound() {
    let bridge = Arc::new(ActuatorBridge::new());
    let cell = Arc::new(SensorCharacteristic::new());
    let sensor = MockSensor::default();
    sensor.raw.store(1234, Ordering::Relaxed);
    let attributes = MockAttributes::default();

    let handles = tasks::spawn_tasks(
        &fast_config(),
        bridge,
        cell.clone(),
        sensor,
        attributes.clone(),
        MockActuator::default(),
    )
    .unwrap();

    // Not bound yet: samples are stored but never pushed.
    assert!(wait_until(Duration::from_secs(2), || cell.samples() >= 2));
    assert!(attributes.writes.lock().unwrap().is_empty());

    cell.bind_handle(SENSOR_HANDLE);
    assert!(wait_until(Duration::from_secs(2), || {
        !attributes.writes.lock().unwrap().is_empty()
    }));

    let report = handles.shutdown().unwrap();
    assert!(report.publish_ticks >= 3);

    let writes = attributes.writes.lock().unwrap();
    assert!(writes
        .iter()
        .all(|(handle, value)| *handle == SENSOR_HANDLE && value[..] == pack_sample(1234)));
}

#[test]
fn shutdown_with_nothing_queued_returns_promptly() {
    let bridge = Arc::new(ActuatorBridge::new());
    let handles = tasks::spawn_tasks(
        &BleConfig::default(),
        bridge.clone(),
        Arc::new(SensorCharacteristic::new()),
        MockSensor::default(),
        MockAttributes::default(),
        MockActuator::default(),
    )
    .unwrap();

    let started = Instant::now();
    let report = handles.shutdown().unwrap();
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(report.commands_applied, 0);
    assert!(report.publish_ticks >= 1);
    assert!(bridge.is_closed());
}
