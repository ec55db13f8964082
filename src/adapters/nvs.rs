//! NVS (Non-Volatile Storage) adapter for the configuration blob.
//!
//! NVS flash must be initialised before Bluedroid comes up (the controller
//! keeps its calibration data there), so this adapter is constructed first
//! in `main`.  The [`BleConfig`] blob lives in namespace `ble`, key
//! `config`, encoded with postcard.  A missing or corrupt blob falls back
//! to defaults; it never stops boot.

use log::{info, warn};

use crate::config::{BleConfig, CONFIG_BLOB_MAX};
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &[u8] = b"ble\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"config\0";

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    blob: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsConfigStore {
    /// Initialise NVS flash, erasing it on layout/version mismatch.
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called from the single main-task context before any
            // concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                warn!("NVS: erasing and re-initialising flash partition");
                // SAFETY: as above.
                if unsafe { nvs_flash_erase() } != ESP_OK as i32 || unsafe { nvs_flash_init() } != ESP_OK as i32 {
                    return Err(Error::Init("nvs_flash_init failed after erase"));
                }
            } else if ret != ESP_OK as i32 {
                return Err(Error::Init("nvs_flash_init failed"));
            }
            info!("NVS: flash initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NVS: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            blob: std::cell::RefCell::new(None),
        })
    }

    /// Stored configuration, or defaults when absent or invalid.
    pub fn load(&self) -> BleConfig {
        match self.read_blob() {
            Ok(Some(bytes)) => match BleConfig::from_bytes(&bytes) {
                Ok(cfg) => {
                    info!("NVS: config loaded ({} bytes)", bytes.len());
                    cfg
                }
                Err(e) => {
                    warn!("NVS: stored config rejected ({}), using defaults", e);
                    BleConfig::default()
                }
            },
            Ok(None) => {
                info!("NVS: no stored config, using defaults");
                BleConfig::default()
            }
            Err(e) => {
                warn!("NVS: read failed ({}), using defaults", e);
                BleConfig::default()
            }
        }
    }

    /// Validate and persist `config`.
    pub fn save(&self, config: &BleConfig) -> Result<()> {
        config.validate()?;
        let bytes = config.to_bytes()?;
        self.write_blob(&bytes)?;
        info!("NVS: config saved ({} bytes)", bytes.len());
        Ok(())
    }

    // ── Backend ───────────────────────────────────────────────

    /// Same read window as the flash backend: anything longer than
    /// `CONFIG_BLOB_MAX` does not fit the read buffer.
    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        match self.blob.borrow().as_deref() {
            Some(bytes) if bytes.len() > CONFIG_BLOB_MAX => Err(Error::Config("nvs_get_blob failed")),
            other => Ok(other.map(<[u8]>::to_vec)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        *self.blob.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }

    /// Simulation: plant raw bytes as if a previous firmware had written them.
    #[cfg(not(target_os = "espidf"))]
    pub fn write_raw(&self, bytes: &[u8]) {
        *self.blob.borrow_mut() = Some(bytes.to_vec());
    }

    #[cfg(target_os = "espidf")]
    fn with_handle<T>(write: bool, f: impl FnOnce(nvs_handle_t) -> Result<T>) -> Result<T> {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: namespace is NUL-terminated; handle outlives the call.
        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr().cast(), mode, &mut handle) };
        if ret == ESP_ERR_NVS_NOT_FOUND as i32 && !write {
            return Err(Error::Config("namespace not found"));
        }
        if ret != ESP_OK as i32 {
            return Err(Error::Init("nvs_open failed"));
        }
        let result = f(handle);
        // SAFETY: handle was opened above.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>> {
        let opened = Self::with_handle(false, |handle| {
            let mut buf = vec![0u8; CONFIG_BLOB_MAX];
            let mut size = buf.len();
            // SAFETY: key is NUL-terminated; buf has `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
            };
            if ret == ESP_ERR_NVS_NOT_FOUND as i32 {
                return Ok(None);
            }
            if ret != ESP_OK as i32 {
                return Err(Error::Config("nvs_get_blob failed"));
            }
            buf.truncate(size);
            Ok(Some(buf))
        });
        match opened {
            Err(Error::Config("namespace not found")) => Ok(None),
            other => other,
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, bytes: &[u8]) -> Result<()> {
        Self::with_handle(true, |handle| {
            // SAFETY: key is NUL-terminated; bytes outlive the call.
            let ret = unsafe {
                nvs_set_blob(handle, CONFIG_KEY.as_ptr().cast(), bytes.as_ptr().cast(), bytes.len())
            };
            if ret != ESP_OK as i32 {
                return Err(Error::Config("nvs_set_blob failed"));
            }
            // SAFETY: handle is open.
            if unsafe { nvs_commit(handle) } != ESP_OK as i32 {
                return Err(Error::Config("nvs_commit failed"));
            }
            Ok(())
        })
    }
}
