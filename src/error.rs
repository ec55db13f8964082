//! Unified error types for the BLE peripheral firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! callback-context error handling uniform.  All variants are `Copy` so they
//! can be passed out of the stack callback path without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A radio stack control call was rejected.
    Stack(StackError),
    /// The actuator bridge refused a command.
    Bridge(BridgeError),
    /// A connection-level precondition was violated.
    Session(SessionError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack(e) => write!(f, "stack: {e}"),
            Self::Bridge(e) => write!(f, "bridge: {e}"),
            Self::Session(e) => write!(f, "session: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stack errors
// ---------------------------------------------------------------------------

/// A control call into the radio stack returned a non-OK code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackError {
    /// Name of the control call, e.g. `"create_service"`.
    pub call: &'static str,
    /// Raw code returned by the stack (`esp_err_t` on ESP-IDF).
    pub code: i32,
}

impl StackError {
    pub const fn new(call: &'static str, code: i32) -> Self {
        Self { call, code }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed (rc={})", self.call, self.code)
    }
}

impl From<StackError> for Error {
    fn from(e: StackError) -> Self {
        Self::Stack(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator bridge errors
// ---------------------------------------------------------------------------

/// Reasons an actuator command was dropped instead of queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The queue stayed full for the whole bounded wait.
    Full,
    /// The bridge was closed for shutdown.
    Closed,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "actuator queue full, command dropped"),
            Self::Closed => write!(f, "actuator bridge closed"),
        }
    }
}

impl From<BridgeError> for Error {
    fn from(e: BridgeError) -> Self {
        Self::Bridge(e)
    }
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// A connect event arrived while another connection is live.
    AlreadyConnected { active: u16, rejected: u16 },
    /// A disconnect event named a connection we do not track.
    UnknownConnection(u16),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConnected { active, rejected } => write!(
                f,
                "conn_id={rejected} rejected, conn_id={active} already active"
            ),
            Self::UnknownConnection(id) => write!(f, "unknown conn_id={id}"),
        }
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
