//! GATT profile and advertising definitions.
//!
//! ## Service A layout
//!
//! | Attribute        | UUID     | Properties                 | Perms       |
//! |------------------|----------|----------------------------|-------------|
//! | Service          | `0xAA01` | primary                    | -           |
//! | Sensor value     | `0xAA02` | Read + Write + Notify      | Read+Write  |
//! | └ CCCD           | `0x2902` | -                          | Read+Write  |
//! | Actuator         | `0xAA04` | Write + WriteNoResponse    | Write       |
//!
//! Service B (`app_id = 1`) registers but publishes no attributes.

use crate::config::BleConfig;

use super::events::BdAddr;

// ───────────────────────────────────────────────────────────────
// UUIDs
// ───────────────────────────────────────────────────────────────

pub const SERVICE_A_UUID: u16 = 0xAA01;
pub const SENSOR_CHAR_UUID: u16 = 0xAA02;
pub const ACTUATOR_CHAR_UUID: u16 = 0xAA04;
/// Client Characteristic Configuration descriptor.
pub const CCCD_UUID: u16 = 0x2902;

/// Attribute handles reserved for service A (service + 2 chars + values + CCCD).
pub const SERVICE_A_NUM_HANDLES: u16 = 8;

/// Declared maximum length of the sensor characteristic value.
pub const SENSOR_VALUE_MAX_LEN: usize = 4;
/// Value the sensor characteristic holds before the first sample.
pub const SENSOR_INITIAL_VALUE: [u8; SENSOR_VALUE_MAX_LEN] = [0xAA, 0x01, 0x01, 0x01];

// ───────────────────────────────────────────────────────────────
// Property / permission bits
// ───────────────────────────────────────────────────────────────

pub const PROP_READ: u8 = 0x02;
pub const PROP_WRITE_NR: u8 = 0x04;
pub const PROP_WRITE: u8 = 0x08;
pub const PROP_NOTIFY: u8 = 0x10;

pub const PERM_READ: u16 = 0x0001;
pub const PERM_WRITE: u16 = 0x0010;

/// Advertising flag: LE General Discoverable Mode.
pub const ADV_FLAG_GEN_DISC: u8 = 0x02;
/// Advertising flag: BR/EDR not supported.
pub const ADV_FLAG_BREDR_NOT_SPT: u8 = 0x04;

// ───────────────────────────────────────────────────────────────
// Application identities
// ───────────────────────────────────────────────────────────────

/// Application identity passed to `register_app`; doubles as the registry index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AppId {
    A = 0,
    B = 1,
}

impl AppId {
    pub const ALL: [AppId; 2] = [AppId::A, AppId::B];

    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::A),
            1 => Some(Self::B),
            _ => None,
        }
    }

    pub const fn raw(self) -> u16 {
        self as u16
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Characteristics owned by a service record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicKind {
    Sensor,
    Actuator,
}

// ───────────────────────────────────────────────────────────────
// Attribute definitions handed to the stack
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDef {
    pub uuid: u16,
    pub is_primary: bool,
    pub inst_id: u8,
    pub num_handles: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDef {
    pub kind: CharacteristicKind,
    pub uuid: u16,
    pub properties: u8,
    pub permissions: u16,
    /// Declared maximum value length; 0 leaves the stack default.
    pub max_len: u16,
    /// Initial value stored in the attribute table, if any.
    pub initial_value: Option<&'static [u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorDef {
    pub uuid: u16,
    pub permissions: u16,
}

pub const SERVICE_A: ServiceDef = ServiceDef {
    uuid: SERVICE_A_UUID,
    is_primary: true,
    inst_id: 0,
    num_handles: SERVICE_A_NUM_HANDLES,
};

pub const SENSOR_CHAR: CharacteristicDef = CharacteristicDef {
    kind: CharacteristicKind::Sensor,
    uuid: SENSOR_CHAR_UUID,
    properties: PROP_READ | PROP_WRITE | PROP_NOTIFY,
    permissions: PERM_READ | PERM_WRITE,
    max_len: SENSOR_VALUE_MAX_LEN as u16,
    initial_value: Some(&SENSOR_INITIAL_VALUE),
};

pub const ACTUATOR_CHAR: CharacteristicDef = CharacteristicDef {
    kind: CharacteristicKind::Actuator,
    uuid: ACTUATOR_CHAR_UUID,
    properties: PROP_WRITE | PROP_WRITE_NR,
    permissions: PERM_WRITE,
    max_len: 0,
    initial_value: None,
};

pub const SENSOR_CCCD: DescriptorDef = DescriptorDef {
    uuid: CCCD_UUID,
    permissions: PERM_READ | PERM_WRITE,
};

// ───────────────────────────────────────────────────────────────
// Advertising payloads
// ───────────────────────────────────────────────────────────────

/// 128-bit Bluetooth base UUID, LSB first, with the short-UUID slot zeroed.
const BASE_UUID_TEMPLATE: [u8; 16] = [
    0xfb, 0x34, 0x9b, 0x5f, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// 16-bit value embedded in the first advertised service UUID (bytes 12..=13).
pub const ADV_UUID16: u16 = 0x00EE;
/// 32-bit value embedded in the second advertised service UUID (bytes 12..=15).
pub const ADV_UUID32: u32 = 0x0000_00FF;

/// Build the two-entry 128-bit service UUID list carried in both frames.
pub fn service_uuid_list(uuid16: u16, uuid32: u32) -> [u8; 32] {
    let mut list = [0u8; 32];
    list[..16].copy_from_slice(&BASE_UUID_TEMPLATE);
    list[12..14].copy_from_slice(&uuid16.to_le_bytes());
    list[16..].copy_from_slice(&BASE_UUID_TEMPLATE);
    list[28..32].copy_from_slice(&uuid32.to_le_bytes());
    list
}

/// One advertising frame configuration (payload or scan response).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingData {
    pub set_scan_rsp: bool,
    pub include_name: bool,
    pub include_txpower: bool,
    /// Preferred connection interval hint; 0 omits it.
    pub min_interval: u16,
    pub max_interval: u16,
    pub appearance: u16,
    pub flag: u8,
    pub service_uuid: [u8; 32],
}

impl AdvertisingData {
    /// The primary advertising payload.
    pub fn payload(config: &BleConfig) -> Self {
        Self {
            set_scan_rsp: false,
            include_name: true,
            include_txpower: false,
            min_interval: config.advertising.hint_interval_min,
            max_interval: config.advertising.hint_interval_max,
            appearance: 0,
            flag: ADV_FLAG_GEN_DISC | ADV_FLAG_BREDR_NOT_SPT,
            service_uuid: service_uuid_list(ADV_UUID16, ADV_UUID32),
        }
    }

    /// The scan-response frame: same UUID list, plus TX power.
    pub fn scan_response() -> Self {
        Self {
            set_scan_rsp: true,
            include_name: true,
            include_txpower: true,
            min_interval: 0,
            max_interval: 0,
            appearance: 0,
            flag: ADV_FLAG_GEN_DISC | ADV_FLAG_BREDR_NOT_SPT,
            service_uuid: service_uuid_list(ADV_UUID16, ADV_UUID32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvType {
    /// Connectable undirected.
    Ind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnAddrType {
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    AllowScanAnyConnAny,
}

/// Channel map bits 37/38/39.
pub const ADV_CHANNEL_ALL: u8 = 0x07;

/// Fixed advertising policy, built once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParams {
    pub interval_min: u16,
    pub interval_max: u16,
    pub adv_type: AdvType,
    pub own_addr_type: OwnAddrType,
    pub channel_map: u8,
    pub filter_policy: FilterPolicy,
}

impl AdvertisingParams {
    pub fn from_config(config: &BleConfig) -> Self {
        Self {
            interval_min: config.advertising.interval_min,
            interval_max: config.advertising.interval_max,
            adv_type: AdvType::Ind,
            own_addr_type: OwnAddrType::Public,
            channel_map: ADV_CHANNEL_ALL,
            filter_policy: FilterPolicy::AllowScanAnyConnAny,
        }
    }
}

/// Connection-parameter update request for one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    pub peer: BdAddr,
    pub interval_min: u16,
    pub interval_max: u16,
    pub latency: u16,
    pub timeout: u16,
}

impl ConnParams {
    pub fn for_peer(peer: BdAddr, config: &BleConfig) -> Self {
        let policy = &config.connection;
        Self {
            peer,
            interval_min: policy.interval_min,
            interval_max: policy.interval_max,
            latency: policy.latency,
            timeout: policy.supervision_timeout,
        }
    }
}
