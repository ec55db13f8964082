//! Radio stack event surface.
//!
//! Tagged-union rendering of the callbacks the stack delivers.  The
//! platform adapter translates raw callback parameters into these types;
//! everything downstream of the adapter only ever sees [`GattsEvent`] and
//! [`GapEvent`].
//!
//! ```text
//!  stack callback ──▶ adapter ──▶ GattsEvent ──▶ ServiceRegistry ──▶ service handler
//!                             └─▶ GapEvent   ──▶ AdvertisingCoordinator
//! ```

use core::fmt;

/// Raw interface value the stack uses for "not bound to any application".
pub const INTERFACE_NONE: u8 = 0xFF;

// ───────────────────────────────────────────────────────────────
// Identities
// ───────────────────────────────────────────────────────────────

/// Stack-assigned identity of a registered application (`gatts_if`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GattInterface(pub u8);

/// Interface tag carried alongside every GATTS event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// Event precedes per-interface registration; every service receives it.
    Unrouted,
    /// Event belongs to exactly one registered interface.
    Bound(GattInterface),
}

impl Interface {
    pub fn from_raw(raw: u8) -> Self {
        if raw == INTERFACE_NONE {
            Self::Unrouted
        } else {
            Self::Bound(GattInterface(raw))
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::Unrouted => INTERFACE_NONE,
            Self::Bound(GattInterface(raw)) => raw,
        }
    }
}

/// 48-bit Bluetooth device address, LSB first as delivered by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Status codes
// ───────────────────────────────────────────────────────────────

/// ATT / GATT status codes used in events and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GattStatus {
    Ok = 0x00,
    InvalidHandle = 0x01,
    ReadNotPermitted = 0x02,
    WriteNotPermitted = 0x03,
    InvalidPdu = 0x04,
    RequestNotSupported = 0x06,
    InvalidOffset = 0x07,
    InvalidAttributeLength = 0x0D,
    NoResources = 0x80,
    InternalError = 0x81,
    WrongState = 0x82,
    Busy = 0x84,
    Error = 0x85,
}

impl GattStatus {
    /// Map a raw status byte; anything unrecognised collapses to [`GattStatus::Error`].
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Self::Ok,
            0x01 => Self::InvalidHandle,
            0x02 => Self::ReadNotPermitted,
            0x03 => Self::WriteNotPermitted,
            0x04 => Self::InvalidPdu,
            0x06 => Self::RequestNotSupported,
            0x07 => Self::InvalidOffset,
            0x0D => Self::InvalidAttributeLength,
            0x80 => Self::NoResources,
            0x81 => Self::InternalError,
            0x82 => Self::WrongState,
            0x84 => Self::Busy,
            _ => Self::Error,
        }
    }

    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

// ───────────────────────────────────────────────────────────────
// GATTS events
// ───────────────────────────────────────────────────────────────

/// Events raised by the GATT server half of the stack.
///
/// Payload bytes are borrowed from the callback parameters and only live for
/// the duration of the dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattsEvent<'a> {
    Registered {
        status: GattStatus,
        app_id: u16,
    },
    ServiceCreated {
        status: GattStatus,
        service_handle: u16,
        service_uuid: u16,
    },
    ServiceStarted {
        status: GattStatus,
        service_handle: u16,
    },
    CharacteristicAdded {
        status: GattStatus,
        attr_handle: u16,
        service_handle: u16,
        char_uuid: u16,
    },
    DescriptorAdded {
        status: GattStatus,
        attr_handle: u16,
        service_handle: u16,
        descr_uuid: u16,
    },
    PeerConnected {
        conn_id: u16,
        addr: BdAddr,
    },
    PeerDisconnected {
        conn_id: u16,
        addr: BdAddr,
        reason: u16,
    },
    Read {
        conn_id: u16,
        trans_id: u32,
        handle: u16,
        offset: u16,
        need_rsp: bool,
    },
    Write {
        conn_id: u16,
        trans_id: u32,
        handle: u16,
        offset: u16,
        need_rsp: bool,
        is_prep: bool,
        value: &'a [u8],
    },
    Confirm {
        status: GattStatus,
        conn_id: u16,
        handle: u16,
    },
    Mtu {
        conn_id: u16,
        mtu: u16,
    },
}

// ───────────────────────────────────────────────────────────────
// GAP events
// ───────────────────────────────────────────────────────────────

/// Events raised by the GAP half of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapEvent {
    AdvertisingDataSet {
        status: GattStatus,
    },
    ScanResponseDataSet {
        status: GattStatus,
    },
    AdvertisingStarted {
        status: GattStatus,
    },
    AdvertisingStopped {
        status: GattStatus,
    },
    ConnectionParamsUpdated {
        status: GattStatus,
        addr: BdAddr,
        conn_interval: u16,
        latency: u16,
        timeout: u16,
    },
}
