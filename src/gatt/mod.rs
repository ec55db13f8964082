//! GATT server core: event types, profile, advertising gate, service
//! registry and the per-service state machines.

pub mod advertising;
pub mod connection;
pub mod events;
pub mod profile;
pub mod registry;
pub mod sensor_service;
pub mod stub_service;
pub mod value;

use crate::app::ports::RadioStack;

use registry::{ServiceHandler, ServiceRegistry};

/// Handler table for the two applications, indexed by `AppId`.
pub fn service_handlers<S: RadioStack>() -> [ServiceHandler<S>; 2] {
    [sensor_service::handle::<S>, stub_service::handle::<S>]
}

/// Registry wired with the firmware's two services.
pub fn build_registry<S: RadioStack>() -> ServiceRegistry<S> {
    ServiceRegistry::new(service_handlers())
}
