//! Service registry: fixed `AppId → ServiceRecord` table and event routing.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  ServiceRegistry                                           │
//! │  ┌───────┬──────────────────────────┬────────────────────┐ │
//! │  │ AppId │ ServiceRecord            │ handler            │ │
//! │  ├───────┼──────────────────────────┼────────────────────┤ │
//! │  │ A     │ iface, handles, phase, … │ sensor_service     │ │
//! │  │ B     │ iface, handles, phase, … │ stub_service       │ │
//! │  └───────┴──────────────────────────┴────────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Registered` is routed by `app_id`.  Every other event goes to each
//! record whose interface matches, or to every record when the event
//! carries [`Interface::Unrouted`].

use log::{debug, error, info, warn};

use crate::app::ports::RadioStack;
use crate::config::BleConfig;
use crate::error::StackError;
use crate::gatt::advertising::AdvertisingCoordinator;
use crate::gatt::connection::ConnectionManager;
use crate::gatt::events::{GattInterface, GattStatus, GattsEvent, Interface};
use crate::gatt::profile::{AppId, CharacteristicKind};
use crate::gatt::value::SensorCharacteristic;
use crate::tasks::actuator::ActuatorBridge;

// ---------------------------------------------------------------------------
// Service record
// ---------------------------------------------------------------------------

/// Lifecycle of one registered application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePhase {
    Unregistered,
    /// Registration requested, or registered and waiting for `ServiceCreated`.
    Registering,
    AddingSensor,
    AddingDescriptor,
    AddingActuator,
    Serving,
    /// Terminal failure; the record ignores every further event.
    Disabled,
}

/// Per-application state, owned by the registry.
#[derive(Debug)]
pub struct ServiceRecord {
    pub app_id: AppId,
    pub interface: Option<GattInterface>,
    pub service_handle: Option<u16>,
    pub characteristic_handles: heapless::FnvIndexMap<CharacteristicKind, u16, 4>,
    pub descriptor_handle: Option<u16>,
    /// Last value written to the client characteristic configuration descriptor.
    pub cccd: u16,
    pub connection: ConnectionManager,
    pub phase: ServicePhase,
}

impl ServiceRecord {
    pub fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            interface: None,
            service_handle: None,
            characteristic_handles: heapless::FnvIndexMap::new(),
            descriptor_handle: None,
            cccd: 0,
            connection: ConnectionManager::new(),
            phase: ServicePhase::Unregistered,
        }
    }

    pub fn characteristic_handle(&self, kind: CharacteristicKind) -> Option<u16> {
        self.characteristic_handles.get(&kind).copied()
    }

    /// Record a handle the stack assigned.  Handles are set once.
    pub fn set_characteristic_handle(&mut self, kind: CharacteristicKind, handle: u16) {
        if let Some(old) = self.characteristic_handle(kind) {
            warn!(
                "SVC {:?}: {:?} handle already {} (ignoring {})",
                self.app_id, kind, old, handle
            );
            return;
        }
        // Capacity 4 > number of kinds.
        let _ = self.characteristic_handles.insert(kind, handle);
    }

    /// Which characteristic value owns `handle`, if any.
    pub fn kind_for_handle(&self, handle: u16) -> Option<CharacteristicKind> {
        self.characteristic_handles
            .iter()
            .find_map(|(kind, h)| (*h == handle).then_some(*kind))
    }

    /// Mark the record unusable.  No retry.
    pub fn disable(&mut self, reason: &str) {
        error!(
            "SVC {:?}: disabled in phase {:?}: {}",
            self.app_id, self.phase, reason
        );
        self.phase = ServicePhase::Disabled;
    }

    /// Disable on a rejected stack call; pass through on success.
    pub fn require(&mut self, result: Result<(), StackError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.disable(&format!("{e}"));
                false
            }
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.phase == ServicePhase::Disabled
    }
}

// ---------------------------------------------------------------------------
// Dispatch context
// ---------------------------------------------------------------------------

/// Everything a service handler may touch besides its own record.
pub struct GattContext<'a, S: RadioStack> {
    pub stack: &'a mut S,
    pub advertising: &'a mut AdvertisingCoordinator,
    pub actuator: &'a ActuatorBridge,
    pub sensor: &'a SensorCharacteristic,
    pub config: &'a BleConfig,
}

/// Per-service event handler.
pub type ServiceHandler<S> = fn(&mut ServiceRecord, &GattsEvent<'_>, &mut GattContext<'_, S>);

struct ServiceSlot<S: RadioStack> {
    record: ServiceRecord,
    handler: ServiceHandler<S>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct ServiceRegistry<S: RadioStack> {
    /// Indexed by `AppId as usize`.
    slots: [ServiceSlot<S>; 2],
}

impl<S: RadioStack> ServiceRegistry<S> {
    /// Build the table; `handlers` are indexed by [`AppId::index`].
    pub fn new(handlers: [ServiceHandler<S>; 2]) -> Self {
        let [a, b] = handlers;
        Self {
            slots: [
                ServiceSlot {
                    record: ServiceRecord::new(AppId::A),
                    handler: a,
                },
                ServiceSlot {
                    record: ServiceRecord::new(AppId::B),
                    handler: b,
                },
            ],
        }
    }

    pub fn record(&self, app_id: AppId) -> &ServiceRecord {
        &self.slots[app_id.index()].record
    }

    pub fn record_mut(&mut self, app_id: AppId) -> &mut ServiceRecord {
        &mut self.slots[app_id.index()].record
    }

    /// Ask the stack to register `app_id`.  Completion arrives as
    /// [`GattsEvent::Registered`].
    pub fn register(&mut self, app_id: AppId, stack: &mut S) -> Result<(), StackError> {
        let record = self.record_mut(app_id);
        if record.phase != ServicePhase::Unregistered {
            warn!("SVC {:?}: register requested in phase {:?}", app_id, record.phase);
        }
        match stack.register_app(app_id.raw()) {
            Ok(()) => {
                record.phase = ServicePhase::Registering;
                Ok(())
            }
            Err(e) => {
                record.disable(&format!("{e}"));
                Err(e)
            }
        }
    }

    /// Route one event; returns the number of records it was delivered to.
    pub fn dispatch(
        &mut self,
        interface: Interface,
        event: &GattsEvent<'_>,
        ctx: &mut GattContext<'_, S>,
    ) -> usize {
        if let GattsEvent::Registered { status, app_id } = *event {
            return self.dispatch_registered(interface, status, app_id, event, ctx);
        }

        let mut delivered = 0;
        for slot in &mut self.slots {
            let owns = match interface {
                Interface::Unrouted => true,
                Interface::Bound(iface) => slot.record.interface == Some(iface),
            };
            if owns {
                (slot.handler)(&mut slot.record, event, ctx);
                delivered += 1;
            }
        }
        if delivered == 0 {
            debug!("REG: no owner for {:?} on {:?}", event, interface);
        }
        delivered
    }

    fn dispatch_registered(
        &mut self,
        interface: Interface,
        status: GattStatus,
        app_id: u16,
        event: &GattsEvent<'_>,
        ctx: &mut GattContext<'_, S>,
    ) -> usize {
        let Some(id) = AppId::from_raw(app_id) else {
            warn!("REG: registration for unknown app_id={}", app_id);
            return 0;
        };
        let slot = &mut self.slots[id.index()];
        if !status.is_ok() {
            slot.record.disable(&format!("registration failed (status=0x{:02x})", status.raw()));
            return 0;
        }
        let Interface::Bound(iface) = interface else {
            slot.record.disable("registration carried no interface");
            return 0;
        };
        info!("REG: app {:?} bound to interface {}", id, iface.0);
        slot.record.interface = Some(iface);
        (slot.handler)(&mut slot.record, event, ctx);
        1
    }
}
