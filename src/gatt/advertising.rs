//! Advertising coordinator: a two-phase gate in front of `start_advertising`.
//!
//! The advertising payload and the scan response are configured with two
//! independent stack calls whose completions arrive as separate GAP events,
//! in either order.  Advertising may only begin once both have completed.
//!
//! ```text
//!              payload ok                 scan-rsp ok
//!  WaitingBoth ──────────▶ WaitingScanResponse ──────────▶ Ready ─▶ start_advertising
//!       │                                                    ▲
//!       └──────────▶ WaitingPayload ─────────────────────────┘
//!        scan-rsp ok                 payload ok
//! ```
//!
//! A failed completion leaves the gate where it is: advertising stays
//! blocked until restart.  Completions arriving in `Ready` are ignored, so
//! advertising is started exactly once per configuration round.

use log::{debug, error, info, warn};

use crate::app::ports::RadioStack;
use crate::error::StackError;
use crate::gatt::events::{GapEvent, GattStatus};
use crate::gatt::profile::{AdvertisingData, AdvertisingParams};

/// Which of the two frames a completion refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvPhase {
    Payload,
    ScanResponse,
}

/// Explicit two-phase gate replacing a pair of pending bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingGate {
    WaitingBoth,
    WaitingPayload,
    WaitingScanResponse,
    Ready,
}

/// Result of feeding one successful completion into the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStep {
    /// Still waiting for the other frame.
    Pending,
    /// Both frames configured: start advertising now.
    Open,
    /// Completion did not change anything (duplicate or already open).
    Ignored,
}

impl AdvertisingGate {
    /// Advance the gate on a successful completion.
    pub fn complete(&mut self, phase: AdvPhase) -> GateStep {
        let (next, step) = match (*self, phase) {
            (Self::WaitingBoth, AdvPhase::Payload) => (Self::WaitingScanResponse, GateStep::Pending),
            (Self::WaitingBoth, AdvPhase::ScanResponse) => (Self::WaitingPayload, GateStep::Pending),
            (Self::WaitingPayload, AdvPhase::Payload)
            | (Self::WaitingScanResponse, AdvPhase::ScanResponse) => (Self::Ready, GateStep::Open),
            (state, _) => (state, GateStep::Ignored),
        };
        *self = next;
        step
    }

    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

// ───────────────────────────────────────────────────────────────
// Coordinator
// ───────────────────────────────────────────────────────────────

/// Owns the gate and the fixed advertising policy.
pub struct AdvertisingCoordinator {
    gate: AdvertisingGate,
    params: AdvertisingParams,
    starts: u32,
}

impl AdvertisingCoordinator {
    pub fn new(params: AdvertisingParams) -> Self {
        Self {
            gate: AdvertisingGate::WaitingBoth,
            params,
            starts: 0,
        }
    }

    pub fn gate(&self) -> AdvertisingGate {
        self.gate
    }

    pub fn params(&self) -> &AdvertisingParams {
        &self.params
    }

    /// Number of `start_advertising` calls issued (gated and restarts).
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Request both frames; arms the gate.
    ///
    /// A rejected configuration call is logged and never retried, so the
    /// corresponding phase stays pending and advertising stays blocked.
    pub fn configure(
        &mut self,
        stack: &mut impl RadioStack,
        payload: &AdvertisingData,
        scan_response: &AdvertisingData,
    ) {
        self.gate = AdvertisingGate::WaitingBoth;
        if let Err(e) = stack.configure_advertising(payload) {
            error!("ADV: payload configuration rejected: {}, advertising blocked", e);
        }
        if let Err(e) = stack.configure_scan_response(scan_response) {
            error!("ADV: scan response configuration rejected: {}, advertising blocked", e);
        }
    }

    pub fn on_payload_configured(&mut self, stack: &mut impl RadioStack, status: GattStatus) {
        self.on_configured(stack, AdvPhase::Payload, status);
    }

    pub fn on_scan_response_configured(&mut self, stack: &mut impl RadioStack, status: GattStatus) {
        self.on_configured(stack, AdvPhase::ScanResponse, status);
    }

    fn on_configured(&mut self, stack: &mut impl RadioStack, phase: AdvPhase, status: GattStatus) {
        if !status.is_ok() {
            error!(
                "ADV: {:?} configuration failed (status=0x{:02x}), advertising blocked",
                phase,
                status.raw()
            );
            return;
        }
        match self.gate.complete(phase) {
            GateStep::Pending => debug!("ADV: {:?} configured, gate={:?}", phase, self.gate),
            GateStep::Open => {
                info!("ADV: payload and scan response configured, starting advertising");
                if let Err(e) = self.start(stack) {
                    error!("ADV: {}", e);
                }
            }
            GateStep::Ignored => debug!("ADV: {:?} completion ignored (gate={:?})", phase, self.gate),
        }
    }

    /// Restart after a disconnect; frames are already configured so the gate is bypassed.
    pub fn restart(&mut self, stack: &mut impl RadioStack) -> Result<(), StackError> {
        info!("ADV: restarting advertising");
        self.start(stack)
    }

    fn start(&mut self, stack: &mut impl RadioStack) -> Result<(), StackError> {
        stack.start_advertising(&self.params)?;
        self.starts = self.starts.wrapping_add(1);
        Ok(())
    }

    /// Route a GAP event; returns `true` if the event was consumed.
    pub fn on_gap_event(&mut self, stack: &mut impl RadioStack, event: &GapEvent) -> bool {
        match *event {
            GapEvent::AdvertisingDataSet { status } => self.on_payload_configured(stack, status),
            GapEvent::ScanResponseDataSet { status } => {
                self.on_scan_response_configured(stack, status);
            }
            GapEvent::AdvertisingStarted { status } => {
                if status.is_ok() {
                    info!("ADV: advertising started");
                } else {
                    error!("ADV: advertising start failed (status=0x{:02x})", status.raw());
                }
            }
            GapEvent::AdvertisingStopped { status } => {
                if status.is_ok() {
                    info!("ADV: advertising stopped");
                } else {
                    warn!("ADV: advertising stop failed (status=0x{:02x})", status.raw());
                }
            }
            GapEvent::ConnectionParamsUpdated { .. } => return false,
        }
        true
    }
}
