//! Bluedroid radio stack adapter (ESP-IDF only).
//!
//! Implements [`RadioStack`] and [`AttributeStore`] over the raw
//! `esp_ble_*` C API and translates the two C callbacks into
//! [`GattsEvent`] / [`GapEvent`] values.  Controller and Bluedroid
//! bring-up itself is left to `esp-idf-svc`'s [`BtDriver`].
//!
//! Bluedroid callbacks are C function pointers that cannot capture Rust
//! closures, so the installed [`PeripheralService`] lives in one static
//! slot.  Every callback runs on the Bluedroid task; control calls only
//! post to that task's queue and never re-enter a callback, so holding
//! the lock across a dispatch is fine.

use std::sync::Mutex;

use esp_idf_svc::bt::{Ble, BtDriver};
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::sys::*;
use log::{error, info, warn};

use crate::app::ports::{AttributeStore, RadioStack};
use crate::app::service::PeripheralService;
use crate::error::{Error, StackError};
use crate::gatt::events::{BdAddr, GapEvent, GattInterface, GattStatus, GattsEvent, Interface};
use crate::gatt::profile::{
    AdvertisingData, AdvertisingParams, CharacteristicDef, ConnParams, DescriptorDef, ServiceDef,
};

// ───────────────────────────────────────────────────────────────
// Static peripheral slot
// ───────────────────────────────────────────────────────────────

static PERIPHERAL: Mutex<Option<PeripheralService<BluedroidStack>>> = Mutex::new(None);

/// Hand the peripheral to the callback context.
pub fn install(service: PeripheralService<BluedroidStack>) {
    match PERIPHERAL.lock() {
        Ok(mut slot) => *slot = Some(service),
        Err(_) => error!("BLE: peripheral slot poisoned"),
    }
}

/// Run `f` against the installed peripheral, if any.
pub fn with_peripheral<R>(f: impl FnOnce(&mut PeripheralService<BluedroidStack>) -> R) -> Option<R> {
    let mut slot = PERIPHERAL.lock().ok()?;
    slot.as_mut().map(f)
}

fn check(call: &'static str, rc: esp_err_t) -> Result<(), StackError> {
    if rc == ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(StackError::new(call, rc))
    }
}

// ───────────────────────────────────────────────────────────────
// Bring-up
// ───────────────────────────────────────────────────────────────

/// Controller + Bluedroid bring-up in BLE-only mode, callbacks registered.
///
/// [`BtDriver`] fills the controller config for the target chip and
/// enables Bluedroid; the raw GATTS/GAP callbacks go on top of it.  The
/// returned driver owns the radio and must stay alive for as long as the
/// peripheral serves; dropping it tears the controller down.
pub fn init(modem: Modem, local_mtu: u16) -> Result<BtDriver<'static, Ble>, Error> {
    // SAFETY: called once from main before the controller is initialised.
    let released = unsafe { esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT) };
    if let Err(e) = check("esp_bt_controller_mem_release", released) {
        warn!("BLE: {}", e);
    }

    let driver = BtDriver::new(modem, None)
        .map_err(|e| Error::Stack(StackError::new("BtDriver::new", e.code())))?;

    // SAFETY: Bluedroid is enabled by the driver above.
    unsafe {
        check(
            "esp_ble_gatts_register_callback",
            esp_ble_gatts_register_callback(Some(gatts_event_handler)),
        )?;
        check(
            "esp_ble_gap_register_callback",
            esp_ble_gap_register_callback(Some(gap_event_handler)),
        )?;
        if let Err(e) = check("esp_ble_gatt_set_local_mtu", esp_ble_gatt_set_local_mtu(local_mtu)) {
            // Non-fatal: the default MTU still works.
            warn!("BLE: {}", e);
        }
    }
    info!("BLE: Bluedroid up (local MTU {})", local_mtu);
    Ok(driver)
}

// ───────────────────────────────────────────────────────────────
// Conversions
// ───────────────────────────────────────────────────────────────

fn uuid16(uuid: u16) -> esp_bt_uuid_t {
    // SAFETY: plain C struct, all-zero is valid.
    let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = ESP_UUID_LEN_16 as u16;
    t.uuid.uuid16 = uuid;
    t
}

/// 16-bit value of a stack UUID, or 0 for longer UUIDs.
fn short_uuid(uuid: &esp_bt_uuid_t) -> u16 {
    if uuid.len == ESP_UUID_LEN_16 as u16 {
        // SAFETY: len says the 16-bit member is active.
        unsafe { uuid.uuid.uuid16 }
    } else {
        0
    }
}

fn status(raw: u32) -> GattStatus {
    GattStatus::from_raw(raw as u8)
}

fn adv_data(data: &AdvertisingData, uuids: &mut [u8; 32]) -> esp_ble_adv_data_t {
    esp_ble_adv_data_t {
        set_scan_rsp: data.set_scan_rsp,
        include_name: data.include_name,
        include_txpower: data.include_txpower,
        min_interval: i32::from(data.min_interval),
        max_interval: i32::from(data.max_interval),
        appearance: i32::from(data.appearance),
        manufacturer_len: 0,
        p_manufacturer_data: core::ptr::null_mut(),
        service_data_len: 0,
        p_service_data: core::ptr::null_mut(),
        service_uuid_len: uuids.len() as u16,
        p_service_uuid: uuids.as_mut_ptr(),
        flag: data.flag,
    }
}

// ───────────────────────────────────────────────────────────────
// RadioStack
// ───────────────────────────────────────────────────────────────

/// Handle to the Bluedroid control API.  Stateless: Bluedroid owns all state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BluedroidStack;

impl RadioStack for BluedroidStack {
    fn register_app(&mut self, app_id: u16) -> Result<(), StackError> {
        // SAFETY: plain FFI call, no pointers.
        check("esp_ble_gatts_app_register", unsafe { esp_ble_gatts_app_register(app_id) })
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        let mut c_name: heapless::Vec<u8, 33> = heapless::Vec::new();
        if c_name.extend_from_slice(name.as_bytes()).is_err() || c_name.push(0).is_err() {
            return Err(StackError::new(
                "esp_ble_gap_set_device_name",
                ESP_ERR_INVALID_SIZE as i32,
            ));
        }
        // SAFETY: NUL-terminated buffer outlives the call; the stack copies it.
        check("esp_ble_gap_set_device_name", unsafe {
            esp_ble_gap_set_device_name(c_name.as_ptr().cast())
        })
    }

    fn configure_advertising(&mut self, data: &AdvertisingData) -> Result<(), StackError> {
        let mut uuids = data.service_uuid;
        let mut raw = adv_data(data, &mut uuids);
        // SAFETY: the stack deep-copies the payload before returning.
        check("esp_ble_gap_config_adv_data", unsafe { esp_ble_gap_config_adv_data(&mut raw) })
    }

    fn configure_scan_response(&mut self, data: &AdvertisingData) -> Result<(), StackError> {
        let mut uuids = data.service_uuid;
        let mut raw = adv_data(data, &mut uuids);
        // SAFETY: as above; `set_scan_rsp` selects the scan-response frame.
        check("esp_ble_gap_config_adv_data(scan_rsp)", unsafe {
            esp_ble_gap_config_adv_data(&mut raw)
        })
    }

    fn create_service(&mut self, interface: GattInterface, service: &ServiceDef) -> Result<(), StackError> {
        let mut id = esp_gatt_srvc_id_t {
            id: esp_gatt_id_t {
                uuid: uuid16(service.uuid),
                inst_id: service.inst_id,
            },
            is_primary: service.is_primary,
        };
        // SAFETY: id is copied by the stack.
        check("esp_ble_gatts_create_service", unsafe {
            esp_ble_gatts_create_service(interface.0, &mut id, service.num_handles)
        })
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), StackError> {
        // SAFETY: plain FFI call.
        check("esp_ble_gatts_start_service", unsafe {
            esp_ble_gatts_start_service(service_handle)
        })
    }

    fn add_characteristic(
        &mut self,
        service_handle: u16,
        characteristic: &CharacteristicDef,
    ) -> Result<(), StackError> {
        let mut uuid = uuid16(characteristic.uuid);
        let mut initial = [0u8; 8];
        let mut value = characteristic.initial_value.map(|bytes| {
            let len = bytes.len().min(initial.len());
            initial[..len].copy_from_slice(&bytes[..len]);
            esp_attr_value_t {
                attr_max_len: characteristic.max_len,
                attr_len: len as u16,
                attr_value: initial.as_mut_ptr(),
            }
        });
        let value_ptr = value
            .as_mut()
            .map_or(core::ptr::null_mut(), |v| v as *mut esp_attr_value_t);
        // Reads and writes are answered from the callback context.
        let mut control = esp_attr_control_t {
            auto_rsp: ESP_GATT_RSP_BY_APP as u8,
        };
        // SAFETY: all pointers outlive the call; the stack deep-copies the value.
        check("esp_ble_gatts_add_char", unsafe {
            esp_ble_gatts_add_char(
                service_handle,
                &mut uuid,
                characteristic.permissions as esp_gatt_perm_t,
                characteristic.properties as esp_gatt_char_prop_t,
                value_ptr,
                &mut control,
            )
        })
    }

    fn add_descriptor(&mut self, service_handle: u16, descriptor: &DescriptorDef) -> Result<(), StackError> {
        let mut uuid = uuid16(descriptor.uuid);
        let mut control = esp_attr_control_t {
            auto_rsp: ESP_GATT_RSP_BY_APP as u8,
        };
        // SAFETY: pointers outlive the call.
        check("esp_ble_gatts_add_char_descr", unsafe {
            esp_ble_gatts_add_char_descr(
                service_handle,
                &mut uuid,
                descriptor.permissions as esp_gatt_perm_t,
                core::ptr::null_mut(),
                &mut control,
            )
        })
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
        // SAFETY: plain C union, all-zero is valid.
        let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
        // SAFETY: attr_value is the member the stack reads for read responses.
        unsafe {
            let attr = &mut rsp.attr_value;
            let len = value.len().min(attr.value.len());
            attr.value[..len].copy_from_slice(&value[..len]);
            attr.len = len as u16;
            attr.handle = handle;
        }
        // SAFETY: rsp outlives the call.
        check("esp_ble_gatts_send_response", unsafe {
            esp_ble_gatts_send_response(
                interface.0,
                conn_id,
                trans_id,
                esp_gatt_status_t::from(status.raw()),
                &mut rsp,
            )
        })
    }

    fn send_write_response(
        &mut self,
        interface: GattInterface,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
    ) -> Result<(), StackError> {
        // SAFETY: null rsp is accepted for write responses.
        check("esp_ble_gatts_send_response", unsafe {
            esp_ble_gatts_send_response(
                interface.0,
                conn_id,
                trans_id,
                esp_gatt_status_t::from(status.raw()),
                core::ptr::null_mut(),
            )
        })
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), StackError> {
        // SAFETY: plain C struct, all-zero is valid.
        let mut raw = esp_ble_adv_params_t {
            adv_int_min: params.interval_min,
            adv_int_max: params.interval_max,
            adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
            own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            channel_map: esp_ble_adv_channel_t::from(params.channel_map),
            adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            ..unsafe { core::mem::zeroed() }
        };
        // SAFETY: raw outlives the call.
        check("esp_ble_gap_start_advertising", unsafe {
            esp_ble_gap_start_advertising(&mut raw)
        })
    }

    fn update_conn_params(&mut self, params: &ConnParams) -> Result<(), StackError> {
        let mut raw = esp_ble_conn_update_params_t {
            bda: params.peer.0,
            min_int: params.interval_min,
            max_int: params.interval_max,
            latency: params.latency,
            timeout: params.timeout,
        };
        // SAFETY: raw outlives the call.
        check("esp_ble_gap_update_conn_params", unsafe {
            esp_ble_gap_update_conn_params(&mut raw)
        })
    }
}

impl AttributeStore for BluedroidStack {
    fn set_attribute_value(&mut self, handle: u16, value: &[u8]) -> Result<(), StackError> {
        // SAFETY: the stack copies `value`; callable from any task.
        check("esp_ble_gatts_set_attr_value", unsafe {
            esp_ble_gatts_set_attr_value(handle, value.len() as u16, value.as_ptr())
        })
    }
}

// ───────────────────────────────────────────────────────────────
// C callbacks
// ───────────────────────────────────────────────────────────────

unsafe extern "C" fn gap_event_handler(event: esp_gap_ble_cb_event_t, param: *mut esp_ble_gap_cb_param_t) {
    if param.is_null() {
        return;
    }
    // SAFETY: Bluedroid passes a valid param block for the duration of the call,
    // and `event` selects the active union member.
    let p = unsafe { &*param };
    let event = unsafe {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => GapEvent::AdvertisingDataSet {
                status: status(p.adv_data_cmpl.status),
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
                GapEvent::ScanResponseDataSet {
                    status: status(p.scan_rsp_data_cmpl.status),
                }
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => GapEvent::AdvertisingStarted {
                status: status(p.adv_start_cmpl.status),
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => GapEvent::AdvertisingStopped {
                status: status(p.adv_stop_cmpl.status),
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT => {
                let u = &p.update_conn_params;
                GapEvent::ConnectionParamsUpdated {
                    status: status(u.status),
                    addr: BdAddr(u.bda),
                    conn_interval: u.conn_int,
                    latency: u.latency,
                    timeout: u.timeout,
                }
            }
            _ => return,
        }
    };
    with_peripheral(|svc| svc.on_gap_event(&event));
}

unsafe extern "C" fn gatts_event_handler(
    event: esp_gatts_cb_event_t,
    gatts_if: esp_gatt_if_t,
    param: *mut esp_ble_gatts_cb_param_t,
) {
    if param.is_null() {
        return;
    }
    let interface = Interface::from_raw(gatts_if);
    // SAFETY: as in the GAP handler.
    let p = unsafe { &*param };
    let event = unsafe {
        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => GattsEvent::Registered {
                status: status(p.reg.status),
                app_id: p.reg.app_id,
            },
            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => GattsEvent::ServiceCreated {
                status: status(p.create.status),
                service_handle: p.create.service_handle,
                service_uuid: short_uuid(&p.create.service_id.id.uuid),
            },
            esp_gatts_cb_event_t_ESP_GATTS_START_EVT => GattsEvent::ServiceStarted {
                status: status(p.start.status),
                service_handle: p.start.service_handle,
            },
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => GattsEvent::CharacteristicAdded {
                status: status(p.add_char.status),
                attr_handle: p.add_char.attr_handle,
                service_handle: p.add_char.service_handle,
                char_uuid: short_uuid(&p.add_char.char_uuid),
            },
            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => GattsEvent::DescriptorAdded {
                status: status(p.add_char_descr.status),
                attr_handle: p.add_char_descr.attr_handle,
                service_handle: p.add_char_descr.service_handle,
                descr_uuid: short_uuid(&p.add_char_descr.descr_uuid),
            },
            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => GattsEvent::PeerConnected {
                conn_id: p.connect.conn_id,
                addr: BdAddr(p.connect.remote_bda),
            },
            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => GattsEvent::PeerDisconnected {
                conn_id: p.disconnect.conn_id,
                addr: BdAddr(p.disconnect.remote_bda),
                reason: p.disconnect.reason as u16,
            },
            esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => GattsEvent::Read {
                conn_id: p.read.conn_id,
                trans_id: p.read.trans_id,
                handle: p.read.handle,
                offset: p.read.offset,
                need_rsp: p.read.need_rsp,
            },
            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let w = &p.write;
                let value = if w.value.is_null() || w.len == 0 {
                    &[][..]
                } else {
                    core::slice::from_raw_parts(w.value, usize::from(w.len))
                };
                GattsEvent::Write {
                    conn_id: w.conn_id,
                    trans_id: w.trans_id,
                    handle: w.handle,
                    offset: w.offset,
                    need_rsp: w.need_rsp,
                    is_prep: w.is_prep,
                    value,
                }
            }
            esp_gatts_cb_event_t_ESP_GATTS_CONF_EVT => GattsEvent::Confirm {
                status: status(p.conf.status),
                conn_id: p.conf.conn_id,
                handle: p.conf.handle,
            },
            esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => GattsEvent::Mtu {
                conn_id: p.mtu.conn_id,
                mtu: p.mtu.mtu,
            },
            _ => return,
        }
    };
    if with_peripheral(|svc| svc.on_gatts_event(interface, &event)).is_none() {
        warn!("BLE: GATTS event before peripheral installed");
    }
}
