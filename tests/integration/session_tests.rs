//! Connect / disconnect handling on Service A.

use ithsble::gatt::connection::DEFAULT_ATT_MTU;
use ithsble::gatt::events::{BdAddr, GattsEvent};
use ithsble::gatt::profile::{AppId, ConnParams};

use super::mock_stack::*;

#[test]
fn connect_requests_connection_parameters() {
    let mut h = Harness::serving();
    h.connect(7, PEER);

    let expected = ConnParams::for_peer(PEER, h.peripheral.config());
    assert!(h.stack().calls.contains(&StackCall::UpdateConnParams(expected)));
    assert_eq!(expected.interval_min, 0x10);
    assert_eq!(expected.interval_max, 0x20);
    assert_eq!(expected.latency, 0);
    assert_eq!(expected.timeout, 400);

    let conn = h.peripheral.record(AppId::A).connection.active().copied().unwrap();
    assert_eq!(conn.conn_id, 7);
    assert_eq!(conn.peer, PEER);
    assert_eq!(conn.mtu, DEFAULT_ATT_MTU);
}

#[test]
fn disconnect_restarts_advertising() {
    let mut h = Harness::serving();
    h.connect(7, PEER);
    h.disconnect(7);

    assert_eq!(h.stack().advertising_starts(), 2);
    assert!(!h.peripheral.record(AppId::A).connection.is_connected());
}

#[test]
fn every_disconnect_restarts_advertising_once() {
    let mut h = Harness::serving();
    for conn_id in 1..=3 {
        h.connect(conn_id, PEER);
        h.disconnect(conn_id);
    }
    assert_eq!(h.stack().advertising_starts(), 4);
    assert_eq!(h.peripheral.record(AppId::A).connection.connects(), 3);
}

#[test]
fn second_peer_is_refused_while_one_is_live() {
    let mut h = Harness::serving();
    h.connect(7, PEER);
    h.connect(8, BdAddr([9; 6]));

    let conn = &h.peripheral.record(AppId::A).connection;
    assert_eq!(conn.active().map(|c| c.conn_id), Some(7));
    assert_eq!(conn.rejected(), 1);
    assert_eq!(
        h.stack().count(|c| matches!(c, StackCall::UpdateConnParams(_))),
        1
    );
}

#[test]
fn disconnect_of_refused_peer_keeps_live_link() {
    let mut h = Harness::serving();
    h.connect(7, PEER);
    h.connect(8, BdAddr([9; 6]));
    h.disconnect(8);

    let conn = &h.peripheral.record(AppId::A).connection;
    assert_eq!(conn.active().map(|c| c.conn_id), Some(7));
    assert_eq!(h.stack().advertising_starts(), 1);

    h.disconnect(7);
    assert!(!h.peripheral.record(AppId::A).connection.is_connected());
    assert_eq!(h.stack().advertising_starts(), 2);
}

#[test]
fn service_b_ignores_connection_events() {
    let mut h = Harness::serving();
    h.gatts(
        B,
        GattsEvent::PeerConnected {
            conn_id: 7,
            addr: PEER,
        },
    );
    assert!(!h.peripheral.record(AppId::B).connection.is_connected());
    assert_eq!(
        h.stack().count(|c| matches!(c, StackCall::UpdateConnParams(_))),
        0
    );
}

#[test]
fn negotiated_mtu_is_recorded() {
    let mut h = Harness::serving();
    h.connect(7, PEER);
    h.gatts(A, GattsEvent::Mtu { conn_id: 7, mtu: 247 });

    let conn = h.peripheral.record(AppId::A).connection.active().copied().unwrap();
    assert_eq!(conn.mtu, 247);
}
