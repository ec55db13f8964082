//! Application core: pure domain logic, zero I/O.
//!
//! The peripheral orchestration lives here.  All interaction with the radio
//! and the hardware happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without a controller attached.

pub mod ports;
pub mod service;
