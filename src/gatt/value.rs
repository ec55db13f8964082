//! Characteristic value storage shared between the callback context and
//! the publisher task.
//!
//! The sensor characteristic's value is resident here so that a read
//! request can be answered immediately, without touching the ADC.  The
//! publisher is the only writer of the value; the callback context is the
//! only writer of the handle.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use super::profile::{SENSOR_INITIAL_VALUE, SENSOR_VALUE_MAX_LEN};

/// Bytes used by one packed sensor sample.
pub const SAMPLE_LEN: usize = 2;

/// Pack a sample as network order (high byte first).
pub fn pack_sample(sample: u16) -> [u8; SAMPLE_LEN] {
    sample.to_be_bytes()
}

/// Inverse of [`pack_sample`]; reads the first two bytes of a value.
pub fn unpack_sample(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

/// Saturate a raw ADC reading to the 16 bits the characteristic carries.
pub fn sample_from_raw(raw: u32) -> u16 {
    u16::try_from(raw).unwrap_or(u16::MAX)
}

// ───────────────────────────────────────────────────────────────
// CharacteristicValue
// ───────────────────────────────────────────────────────────────

/// Value exceeds the characteristic's declared maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTooLong {
    pub len: usize,
    pub max: usize,
}

/// Typed byte buffer with a declared maximum length `N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicValue<const N: usize> {
    bytes: heapless::Vec<u8, N>,
}

impl<const N: usize> CharacteristicValue<N> {
    pub const MAX_LEN: usize = N;

    pub fn new(initial: &[u8]) -> Result<Self, ValueTooLong> {
        let mut value = Self {
            bytes: heapless::Vec::new(),
        };
        value.set(initial)?;
        Ok(value)
    }

    pub fn set(&mut self, bytes: &[u8]) -> Result<(), ValueTooLong> {
        if bytes.len() > N {
            return Err(ValueTooLong {
                len: bytes.len(),
                max: N,
            });
        }
        self.bytes.clear();
        // Length checked above.
        let _ = self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The value zero-padded to the full declared length.
    pub fn padded(&self) -> [u8; N] {
        let mut out = [0u8; N];
        out[..self.bytes.len()].copy_from_slice(&self.bytes);
        out
    }
}

/// The sensor characteristic's value type.
pub type SensorValue = CharacteristicValue<SENSOR_VALUE_MAX_LEN>;

// ───────────────────────────────────────────────────────────────
// SensorCharacteristic (shared cell)
// ───────────────────────────────────────────────────────────────

struct SensorSlot {
    handle: Option<u16>,
    value: SensorValue,
    samples: u32,
}

/// Shared, lock-protected home of the sensor characteristic.
pub struct SensorCharacteristic {
    inner: Mutex<CriticalSectionRawMutex, RefCell<SensorSlot>>,
}

impl Default for SensorCharacteristic {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorCharacteristic {
    pub fn new() -> Self {
        let mut bytes = heapless::Vec::new();
        let _ = bytes.extend_from_slice(&SENSOR_INITIAL_VALUE);
        Self {
            inner: Mutex::new(RefCell::new(SensorSlot {
                handle: None,
                value: CharacteristicValue { bytes },
                samples: 0,
            })),
        }
    }

    /// Record the attribute handle once the stack has assigned it.
    pub fn bind_handle(&self, handle: u16) {
        self.inner.lock(|slot| slot.borrow_mut().handle = Some(handle));
    }

    pub fn handle(&self) -> Option<u16> {
        self.inner.lock(|slot| slot.borrow().handle)
    }

    /// Store a new packed sample; returns the handle to push it to, if bound.
    pub fn store_sample(&self, sample: u16) -> Option<u16> {
        self.inner.lock(|slot| {
            let mut slot = slot.borrow_mut();
            // SAMPLE_LEN <= SENSOR_VALUE_MAX_LEN, cannot fail.
            let _ = slot.value.set(&pack_sample(sample));
            slot.samples = slot.samples.wrapping_add(1);
            slot.handle
        })
    }

    /// Snapshot of the resident value.
    pub fn value(&self) -> SensorValue {
        self.inner.lock(|slot| slot.borrow().value.clone())
    }

    /// Number of samples stored since boot.
    pub fn samples(&self) -> u32 {
        self.inner.lock(|slot| slot.borrow().samples)
    }
}
