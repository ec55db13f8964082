//! Cross-context actuator bridge.
//!
//! The write handler runs in the radio stack's callback context and must
//! not block for long; the actuator task drives the GPIO on its own thread.
//! A bounded `embassy-sync` channel is the only thing they share.
//!
//! ```text
//! ┌──────────────────┐   bool (FIFO, depth N)   ┌────────────────┐
//! │  write handler   │─────────────────────────▶│ actuator task  │──▶ set_digital_output
//! │ (stack callback) │   send(cmd, timeout)     │ (blocking rx)  │
//! └──────────────────┘                          └────────────────┘
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;
use futures_lite::future::{block_on, or};
use log::{debug, info, warn};

use crate::app::ports::ActuatorPort;
use crate::error::BridgeError;
use crate::tasks::watchdog::{FEED_INTERVAL, TaskWatchdog};

/// Queue depth used by the firmware.
pub const ACTUATOR_QUEUE_DEPTH: usize = 10;

/// Result of a bounded wait on the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recv {
    Command(bool),
    /// Nothing arrived within the wait.
    Idle,
    /// Closed and drained.
    Closed,
}

/// Bounded single-producer / single-consumer queue of on/off commands.
pub struct ActuatorBridge<const N: usize = ACTUATOR_QUEUE_DEPTH> {
    queue: Channel<CriticalSectionRawMutex, bool, N>,
    shutdown: Signal<CriticalSectionRawMutex, ()>,
    closed: AtomicBool,
    dropped: AtomicU32,
}

impl<const N: usize> Default for ActuatorBridge<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ActuatorBridge<N> {
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            shutdown: Signal::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a command, waiting at most `timeout` for space.
    ///
    /// `Err` is the explicit drop signal: the command was not queued and
    /// has been counted in [`dropped`](Self::dropped).
    pub fn send(&self, cmd: bool, timeout: Duration) -> Result<(), BridgeError> {
        if self.is_closed() {
            return Err(self.reject(BridgeError::Closed));
        }
        match self.queue.try_send(cmd) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(_)) if timeout.is_zero() => {
                return Err(self.reject(BridgeError::Full));
            }
            Err(TrySendError::Full(_)) => {}
        }

        debug!("ACT: queue full, waiting up to {:?}", timeout);
        let sent = block_on(or(
            async {
                self.queue.send(cmd).await;
                true
            },
            async {
                async_io_mini::Timer::after(timeout).await;
                false
            },
        ));
        if sent {
            Ok(())
        } else {
            Err(self.reject(BridgeError::Full))
        }
    }

    fn reject(&self, err: BridgeError) -> BridgeError {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        err
    }

    /// Blocking receive.  `None` once the bridge is closed and drained.
    pub fn recv(&self) -> Option<bool> {
        if let Ok(cmd) = self.queue.try_receive() {
            return Some(cmd);
        }
        if self.is_closed() {
            return None;
        }
        let next = block_on(or(
            async { Some(self.queue.receive().await) },
            async {
                self.shutdown.wait().await;
                None
            },
        ));
        // Items queued before `close()` are still delivered.
        next.or_else(|| self.queue.try_receive().ok())
    }

    /// Receive, waiting at most `timeout` for a command.
    pub fn recv_timeout(&self, timeout: Duration) -> Recv {
        if let Ok(cmd) = self.queue.try_receive() {
            return Recv::Command(cmd);
        }
        if self.is_closed() {
            return Recv::Closed;
        }
        let next = block_on(or(
            async { Recv::Command(self.queue.receive().await) },
            or(
                async {
                    self.shutdown.wait().await;
                    Recv::Closed
                },
                async {
                    async_io_mini::Timer::after(timeout).await;
                    Recv::Idle
                },
            ),
        ));
        match next {
            Recv::Closed => self.queue.try_receive().map_or(Recv::Closed, Recv::Command),
            other => other,
        }
    }

    /// Reject further sends and wake the consumer.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("ACT: bridge closed ({} queued)", self.queue.len());
            self.shutdown.signal(());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Commands currently waiting for the consumer.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Commands refused since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ───────────────────────────────────────────────────────────────
// Consumer task
// ───────────────────────────────────────────────────────────────

/// Actuator task body: apply every command in arrival order until the
/// bridge is closed and drained, feeding `watchdog` at least every
/// [`FEED_INTERVAL`].  Returns the number of commands applied.
pub fn run_actuator<A: ActuatorPort, const N: usize>(
    bridge: Arc<ActuatorBridge<N>>,
    mut port: A,
    pin: u8,
    watchdog: &mut TaskWatchdog,
) -> u32 {
    info!("ACT: task running (pin={}, depth={})", pin, N);
    let mut applied: u32 = 0;
    loop {
        watchdog.feed();
        match bridge.recv_timeout(FEED_INTERVAL) {
            Recv::Command(level) => {
                debug!("ACT: pin {} -> {}", pin, if level { "HIGH" } else { "LOW" });
                port.set_digital_output(pin, level);
                applied = applied.wrapping_add(1);
            }
            Recv::Idle => {}
            Recv::Closed => break,
        }
    }
    if bridge.dropped() > 0 {
        warn!("ACT: {} command(s) dropped over bridge lifetime", bridge.dropped());
    }
    info!("ACT: task exiting after {} command(s)", applied);
    applied
}
