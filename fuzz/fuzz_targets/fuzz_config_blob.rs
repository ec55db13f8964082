//! Fuzz target: `BleConfig::from_bytes` (NVS config blob)
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Any blob the decoder accepts passes `validate()`
//! - An accepted config re-encodes within `CONFIG_BLOB_MAX`
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use ithsble::config::{BleConfig, CONFIG_BLOB_MAX};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = BleConfig::from_bytes(data) else {
        return;
    };
    assert!(config.validate().is_ok(), "decoder accepted an invalid config");

    let bytes = config.to_bytes().expect("valid config must encode");
    assert!(bytes.len() <= CONFIG_BLOB_MAX);
    assert_eq!(BleConfig::from_bytes(&bytes).ok(), Some(config));
});
