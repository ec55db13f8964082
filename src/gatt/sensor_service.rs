//! Service A: sensor value + actuator characteristic.
//!
//! Bring-up is strictly serialized so every completion has exactly one
//! outstanding request it can belong to:
//!
//! ```text
//! Registered ─▶ create_service
//! ServiceCreated ─▶ start_service, add_characteristic(sensor)        [AddingSensor]
//! CharacteristicAdded(0xAA02) ─▶ add_descriptor(CCCD)                [AddingDescriptor]
//! DescriptorAdded(0x2902) ─▶ add_characteristic(actuator)            [AddingActuator]
//! CharacteristicAdded(0xAA04)                                        [Serving]
//! ```

use log::{debug, error, info, warn};

use crate::app::ports::RadioStack;
use crate::gatt::events::{BdAddr, GattStatus, GattsEvent};
use crate::gatt::profile::{
    ACTUATOR_CHAR, AdvertisingData, CCCD_UUID, CharacteristicDef, CharacteristicKind, ConnParams,
    SENSOR_CCCD, SENSOR_CHAR, SERVICE_A,
};
use crate::gatt::registry::{GattContext, ServicePhase, ServiceRecord};

/// Service A event handler.
pub fn handle<S: RadioStack>(record: &mut ServiceRecord, event: &GattsEvent<'_>, ctx: &mut GattContext<'_, S>) {
    if record.is_disabled() {
        debug!("SVC A: disabled, dropping {:?}", event);
        return;
    }
    match *event {
        GattsEvent::Registered { .. } => on_registered(record, ctx),
        GattsEvent::ServiceCreated {
            status,
            service_handle,
            service_uuid,
        } => on_service_created(record, ctx, status, service_handle, service_uuid),
        GattsEvent::ServiceStarted {
            status,
            service_handle,
        } => {
            if status.is_ok() {
                info!("SVC A: service {} started", service_handle);
            } else {
                record.disable(&format!("start_service completed with status=0x{:02x}", status.raw()));
            }
        }
        GattsEvent::CharacteristicAdded {
            status,
            attr_handle,
            char_uuid,
            ..
        } => on_characteristic_added(record, ctx, status, attr_handle, char_uuid),
        GattsEvent::DescriptorAdded {
            status,
            attr_handle,
            descr_uuid,
            ..
        } => on_descriptor_added(record, ctx, status, attr_handle, descr_uuid),
        GattsEvent::PeerConnected { conn_id, addr } => on_connect(record, ctx, conn_id, addr),
        GattsEvent::PeerDisconnected { conn_id, reason, .. } => {
            match record.connection.on_disconnect(conn_id, reason) {
                Ok(_) => {
                    if let Err(e) = ctx.advertising.restart(&mut *ctx.stack) {
                        error!("SVC A: advertising restart failed: {}", e);
                    }
                }
                Err(e) => warn!("SVC A: disconnect ignored: {}", e),
            }
        }
        GattsEvent::Read {
            conn_id,
            trans_id,
            handle,
            need_rsp,
            ..
        } => on_read(record, ctx, conn_id, trans_id, handle, need_rsp),
        GattsEvent::Write {
            conn_id,
            trans_id,
            handle,
            need_rsp,
            is_prep,
            value,
            ..
        } => on_write(record, ctx, conn_id, trans_id, handle, need_rsp, is_prep, value),
        GattsEvent::Confirm {
            status,
            conn_id,
            handle,
        } => {
            if !status.is_ok() {
                warn!(
                    "SVC A: confirm failed conn_id={} handle={} status=0x{:02x}",
                    conn_id,
                    handle,
                    status.raw()
                );
            }
        }
        GattsEvent::Mtu { conn_id, mtu } => record.connection.on_mtu(conn_id, mtu),
    }
}

// ---------------------------------------------------------------------------
// Bring-up
// ---------------------------------------------------------------------------

fn on_registered<S: RadioStack>(record: &mut ServiceRecord, ctx: &mut GattContext<'_, S>) {
    let Some(iface) = record.interface else {
        return;
    };
    info!("SVC A: registered on interface {}", iface.0);

    if let Err(e) = ctx.stack.set_device_name(ctx.config.device_name.as_str()) {
        error!("SVC A: {}", e);
    }
    ctx.advertising.configure(
        &mut *ctx.stack,
        &AdvertisingData::payload(ctx.config),
        &AdvertisingData::scan_response(),
    );
    record.require(ctx.stack.create_service(iface, &SERVICE_A));
}

fn on_service_created<S: RadioStack>(
    record: &mut ServiceRecord,
    ctx: &mut GattContext<'_, S>,
    status: GattStatus,
    service_handle: u16,
    service_uuid: u16,
) {
    if service_uuid != SERVICE_A.uuid {
        warn!("SVC A: ignoring creation of service 0x{:04x}", service_uuid);
        return;
    }
    if record.phase != ServicePhase::Registering || record.service_handle.is_some() {
        warn!("SVC A: duplicate ServiceCreated in phase {:?}", record.phase);
        return;
    }
    if !status.is_ok() {
        record.disable(&format!("create_service failed (status=0x{:02x})", status.raw()));
        return;
    }
    info!("SVC A: service created, handle={}", service_handle);
    record.service_handle = Some(service_handle);
    if record.require(ctx.stack.start_service(service_handle))
        && record.require(ctx.stack.add_characteristic(service_handle, &SENSOR_CHAR))
    {
        record.phase = ServicePhase::AddingSensor;
    }
}

/// The characteristic a completion in the current phase must belong to.
fn pending_characteristic(phase: ServicePhase) -> Option<&'static CharacteristicDef> {
    match phase {
        ServicePhase::AddingSensor => Some(&SENSOR_CHAR),
        ServicePhase::AddingActuator => Some(&ACTUATOR_CHAR),
        _ => None,
    }
}

fn on_characteristic_added<S: RadioStack>(
    record: &mut ServiceRecord,
    ctx: &mut GattContext<'_, S>,
    status: GattStatus,
    attr_handle: u16,
    char_uuid: u16,
) {
    let Some(expected) = pending_characteristic(record.phase) else {
        warn!(
            "SVC A: unexpected characteristic 0x{:04x} completion in phase {:?}",
            char_uuid, record.phase
        );
        return;
    };
    if char_uuid != expected.uuid {
        warn!(
            "SVC A: characteristic 0x{:04x} completed while adding 0x{:04x}, ignored",
            char_uuid, expected.uuid
        );
        return;
    }
    if !status.is_ok() {
        record.disable(&format!(
            "add_characteristic 0x{:04x} failed (status=0x{:02x})",
            char_uuid,
            status.raw()
        ));
        return;
    }
    let Some(service_handle) = record.service_handle else {
        record.disable("characteristic added without a service handle");
        return;
    };

    info!("SVC A: characteristic 0x{:04x} handle={}", char_uuid, attr_handle);
    record.set_characteristic_handle(expected.kind, attr_handle);
    match expected.kind {
        CharacteristicKind::Sensor => {
            ctx.sensor.bind_handle(attr_handle);
            if record.require(ctx.stack.add_descriptor(service_handle, &SENSOR_CCCD)) {
                record.phase = ServicePhase::AddingDescriptor;
            }
        }
        CharacteristicKind::Actuator => {
            record.phase = ServicePhase::Serving;
            info!("SVC A: serving");
        }
    }
}

fn on_descriptor_added<S: RadioStack>(
    record: &mut ServiceRecord,
    ctx: &mut GattContext<'_, S>,
    status: GattStatus,
    attr_handle: u16,
    descr_uuid: u16,
) {
    if record.phase != ServicePhase::AddingDescriptor || descr_uuid != CCCD_UUID {
        warn!(
            "SVC A: unexpected descriptor 0x{:04x} completion in phase {:?}",
            descr_uuid, record.phase
        );
        return;
    }
    if !status.is_ok() {
        record.disable(&format!("add_descriptor failed (status=0x{:02x})", status.raw()));
        return;
    }
    let Some(service_handle) = record.service_handle else {
        record.disable("descriptor added without a service handle");
        return;
    };
    info!("SVC A: CCCD handle={}", attr_handle);
    record.descriptor_handle = Some(attr_handle);
    if record.require(ctx.stack.add_characteristic(service_handle, &ACTUATOR_CHAR)) {
        record.phase = ServicePhase::AddingActuator;
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

fn on_connect<S: RadioStack>(record: &mut ServiceRecord, ctx: &mut GattContext<'_, S>, conn_id: u16, addr: BdAddr) {
    if record.connection.on_connect(conn_id, addr).is_err() {
        return;
    }
    if let Err(e) = ctx.stack.update_conn_params(&ConnParams::for_peer(addr, ctx.config)) {
        error!("SVC A: {}", e);
    }
}

// ---------------------------------------------------------------------------
// Attribute access
// ---------------------------------------------------------------------------

/// Which attribute of this service a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Characteristic(CharacteristicKind),
    Cccd,
}

fn resolve(record: &ServiceRecord, handle: u16) -> Option<Attribute> {
    if record.descriptor_handle == Some(handle) {
        return Some(Attribute::Cccd);
    }
    record.kind_for_handle(handle).map(Attribute::Characteristic)
}

fn on_read<S: RadioStack>(
    record: &mut ServiceRecord,
    ctx: &mut GattContext<'_, S>,
    conn_id: u16,
    trans_id: u32,
    handle: u16,
    need_rsp: bool,
) {
    if !need_rsp {
        debug!("SVC A: read of handle {} answered by the stack", handle);
        return;
    }
    let Some(iface) = record.interface else {
        return;
    };
    let result = match resolve(record, handle) {
        Some(Attribute::Characteristic(CharacteristicKind::Sensor)) => {
            let value = ctx.sensor.value().padded();
            debug!("SVC A: read sensor -> {:02x?}", value);
            ctx.stack
                .send_read_response(iface, conn_id, trans_id, GattStatus::Ok, handle, &value)
        }
        Some(Attribute::Cccd) => ctx.stack.send_read_response(
            iface,
            conn_id,
            trans_id,
            GattStatus::Ok,
            handle,
            &record.cccd.to_le_bytes(),
        ),
        _ => {
            warn!("SVC A: read of unknown handle {}", handle);
            ctx.stack
                .send_read_response(iface, conn_id, trans_id, GattStatus::InvalidHandle, handle, &[])
        }
    };
    if let Err(e) = result {
        error!("SVC A: {}", e);
    }
}

fn on_write<S: RadioStack>(
    record: &mut ServiceRecord,
    ctx: &mut GattContext<'_, S>,
    conn_id: u16,
    trans_id: u32,
    handle: u16,
    need_rsp: bool,
    is_prep: bool,
    value: &[u8],
) {
    let Some(iface) = record.interface else {
        return;
    };
    let status = match resolve(record, handle) {
        _ if is_prep => {
            warn!("SVC A: prepared write to handle {} not supported", handle);
            GattStatus::RequestNotSupported
        }
        Some(Attribute::Characteristic(CharacteristicKind::Actuator)) => actuator_write(ctx, value),
        Some(Attribute::Cccd) => match <[u8; 2]>::try_from(value) {
            Ok(bytes) => {
                record.cccd = u16::from_le_bytes(bytes);
                info!("SVC A: CCCD <- 0x{:04x}", record.cccd);
                GattStatus::Ok
            }
            Err(_) => {
                warn!("SVC A: CCCD write of {} byte(s) rejected", value.len());
                GattStatus::InvalidAttributeLength
            }
        },
        Some(Attribute::Characteristic(CharacteristicKind::Sensor)) => {
            debug!("SVC A: write to sensor value ignored ({} byte(s))", value.len());
            GattStatus::Ok
        }
        None => {
            warn!("SVC A: write to unknown handle {}", handle);
            GattStatus::InvalidHandle
        }
    };

    if need_rsp {
        if let Err(e) = ctx.stack.send_write_response(iface, conn_id, trans_id, status) {
            error!("SVC A: {}", e);
        }
    }
}

/// Decode one command byte and hand it to the actuator task.
fn actuator_write<S: RadioStack>(ctx: &mut GattContext<'_, S>, value: &[u8]) -> GattStatus {
    let Some(&first) = value.first() else {
        warn!("SVC A: empty actuator write rejected");
        return GattStatus::InvalidAttributeLength;
    };
    let cmd = first != 0;
    match ctx.actuator.send(cmd, ctx.config.actuator_send_timeout()) {
        Ok(()) => {
            debug!("SVC A: actuator <- {}", cmd);
            GattStatus::Ok
        }
        Err(e) => {
            warn!("SVC A: command dropped: {} ({} total)", e, ctx.actuator.dropped());
            GattStatus::NoResources
        }
    }
}
