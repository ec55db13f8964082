//! Peripheral service: the hexagonal core.
//!
//! [`PeripheralService`] owns the radio stack handle, the service registry,
//! the advertising coordinator and the shared halves of the two task
//! channels.  It is the single entry point for every stack callback, so all
//! GATT state is touched from one context only.
//!
//! ```text
//!   GattsEvent ──▶ ┌──────────────────────────┐ ──▶ RadioStack
//!                  │    PeripheralService     │
//!   GapEvent   ──▶ │ Registry · Advertising   │ ──▶ ActuatorBridge ──▶ actuator task
//!                  └──────────────────────────┘
//!                               ▲
//!                  SensorCharacteristic ◀── publisher task
//! ```

use std::sync::Arc;

use log::{info, warn};

use crate::config::BleConfig;
use crate::error::StackError;
use crate::gatt::advertising::AdvertisingCoordinator;
use crate::gatt::build_registry;
use crate::gatt::events::{GapEvent, GattsEvent, Interface};
use crate::gatt::profile::{AdvertisingParams, AppId};
use crate::gatt::registry::{GattContext, ServiceRecord, ServiceRegistry};
use crate::gatt::value::SensorCharacteristic;
use crate::tasks::actuator::ActuatorBridge;

use super::ports::RadioStack;

// ───────────────────────────────────────────────────────────────
// PeripheralService
// ───────────────────────────────────────────────────────────────

pub struct PeripheralService<S: RadioStack> {
    stack: S,
    registry: ServiceRegistry<S>,
    advertising: AdvertisingCoordinator,
    actuator: Arc<ActuatorBridge>,
    sensor: Arc<SensorCharacteristic>,
    config: BleConfig,
}

impl<S: RadioStack> PeripheralService<S> {
    pub fn new(
        stack: S,
        config: BleConfig,
        actuator: Arc<ActuatorBridge>,
        sensor: Arc<SensorCharacteristic>,
    ) -> Self {
        let advertising = AdvertisingCoordinator::new(AdvertisingParams::from_config(&config));
        Self {
            stack,
            registry: build_registry(),
            advertising,
            actuator,
            sensor,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Register both applications.  Everything after this is event-driven.
    ///
    /// A failed registration disables only that application; the first
    /// error is returned after both have been attempted.
    pub fn start(&mut self) -> Result<(), StackError> {
        info!("Peripheral starting ({})", self.config.device_name);
        let mut first_err = None;
        for app_id in AppId::ALL {
            if let Err(e) = self.registry.register(app_id, &mut self.stack) {
                warn!("app {:?} not registered: {}", app_id, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    // ── Event entry points ────────────────────────────────────

    /// Route a GATT server event; returns how many services received it.
    pub fn on_gatts_event(&mut self, interface: Interface, event: &GattsEvent<'_>) -> usize {
        let mut ctx = GattContext {
            stack: &mut self.stack,
            advertising: &mut self.advertising,
            actuator: &self.actuator,
            sensor: &self.sensor,
            config: &self.config,
        };
        self.registry.dispatch(interface, event, &mut ctx)
    }

    pub fn on_gap_event(&mut self, event: &GapEvent) {
        if self.advertising.on_gap_event(&mut self.stack, event) {
            return;
        }
        if let GapEvent::ConnectionParamsUpdated {
            status,
            addr,
            conn_interval,
            latency,
            timeout,
        } = *event
        {
            if status.is_ok() {
                info!(
                    "conn params updated for {}: interval={} latency={} timeout={}",
                    addr, conn_interval, latency, timeout
                );
            } else {
                warn!(
                    "conn param update for {} failed (status=0x{:02x})",
                    addr,
                    status.raw()
                );
            }
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn record(&self, app_id: AppId) -> &ServiceRecord {
        self.registry.record(app_id)
    }

    pub fn advertising(&self) -> &AdvertisingCoordinator {
        &self.advertising
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    pub fn config(&self) -> &BleConfig {
        &self.config
    }

    pub fn actuator(&self) -> &Arc<ActuatorBridge> {
        &self.actuator
    }

    pub fn sensor(&self) -> &Arc<SensorCharacteristic> {
        &self.sensor
    }
}
