//! Single-peer connection tracking for a service record.

use log::{info, warn};

use crate::error::SessionError;
use crate::gatt::events::BdAddr;

/// Default ATT MTU before any exchange.
pub const DEFAULT_ATT_MTU: u16 = 23;

/// Live connection to the one supported peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionContext {
    pub conn_id: u16,
    pub peer: BdAddr,
    pub mtu: u16,
}

/// Tracks at most one connection at a time.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    active: Option<ConnectionContext>,
    connects: u32,
    rejected: u32,
}

impl ConnectionManager {
    pub const fn new() -> Self {
        Self {
            active: None,
            connects: 0,
            rejected: 0,
        }
    }

    pub fn active(&self) -> Option<&ConnectionContext> {
        self.active.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Connections accepted since boot.
    pub fn connects(&self) -> u32 {
        self.connects
    }

    /// Second-peer connects refused since boot.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Adopt a new peer, or refuse it while another is live.
    pub fn on_connect(&mut self, conn_id: u16, peer: BdAddr) -> Result<&ConnectionContext, SessionError> {
        if let Some(active) = self.active {
            self.rejected = self.rejected.wrapping_add(1);
            let err = SessionError::AlreadyConnected {
                active: active.conn_id,
                rejected: conn_id,
            };
            warn!("CONN: {} (peer {})", err, peer);
            return Err(err);
        }
        self.connects = self.connects.wrapping_add(1);
        info!("CONN: peer {} connected (conn_id={})", peer, conn_id);
        Ok(self.active.insert(ConnectionContext {
            conn_id,
            peer,
            mtu: DEFAULT_ATT_MTU,
        }))
    }

    /// Drop the live connection.  A disconnect for any other id leaves the
    /// live link untouched.
    pub fn on_disconnect(&mut self, conn_id: u16, reason: u16) -> Result<ConnectionContext, SessionError> {
        match self.active {
            Some(ctx) if ctx.conn_id == conn_id => {
                self.active = None;
                info!(
                    "CONN: peer {} disconnected (conn_id={}, reason=0x{:04x})",
                    ctx.peer, conn_id, reason
                );
                Ok(ctx)
            }
            other => {
                warn!(
                    "CONN: disconnect for unknown conn_id={} (active={:?})",
                    conn_id,
                    other.map(|c| c.conn_id)
                );
                Err(SessionError::UnknownConnection(conn_id))
            }
        }
    }

    pub fn on_mtu(&mut self, conn_id: u16, mtu: u16) {
        match self.active.as_mut() {
            Some(ctx) if ctx.conn_id == conn_id => {
                info!("CONN: conn_id={} mtu={}", conn_id, mtu);
                ctx.mtu = mtu;
            }
            _ => warn!("CONN: mtu={} for unknown conn_id={}", mtu, conn_id),
        }
    }
}
