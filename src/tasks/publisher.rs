//! Periodic sensor publisher.
//!
//! Once per period: one ADC read, saturate to 16 bits, pack high byte
//! first, store into the shared sensor cell and push to the stack's
//! attribute table once the characteristic handle is known.  No
//! notification is sent from here.

use std::sync::Arc;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future::{block_on, or};
use log::{debug, info, warn};

use crate::app::ports::{AttributeStore, SensorPort};
use crate::gatt::value::{SensorCharacteristic, pack_sample, sample_from_raw};
use crate::tasks::watchdog::TaskWatchdog;

/// Stop flag shared between the owner and the publisher thread.
pub type PublisherStop = Signal<CriticalSectionRawMutex, ()>;

/// Outcome of one publish tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub raw: u32,
    pub sample: u16,
    /// Handle pushed to, or `None` while the characteristic is not yet added.
    pub pushed_to: Option<u16>,
}

pub struct SensorPublisher<P: SensorPort, A: AttributeStore> {
    sensor: P,
    attributes: A,
    cell: Arc<SensorCharacteristic>,
    period: Duration,
    ticks: u32,
    push_failures: u32,
}

impl<P: SensorPort, A: AttributeStore> SensorPublisher<P, A> {
    pub fn new(sensor: P, attributes: A, cell: Arc<SensorCharacteristic>, period: Duration) -> Self {
        Self {
            sensor,
            attributes,
            cell,
            period,
            ticks: 0,
            push_failures: 0,
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn push_failures(&self) -> u32 {
        self.push_failures
    }

    /// One publish cycle.
    pub fn tick(&mut self) -> Tick {
        let raw = self.sensor.read_analog();
        let sample = sample_from_raw(raw);
        if u32::from(sample) != raw {
            debug!("PUB: raw reading {} saturated to {}", raw, sample);
        }
        self.ticks = self.ticks.wrapping_add(1);

        let handle = self.cell.store_sample(sample);
        let pushed_to = match handle {
            Some(handle) => match self.attributes.set_attribute_value(handle, &pack_sample(sample)) {
                Ok(()) => Some(handle),
                Err(e) => {
                    self.push_failures = self.push_failures.wrapping_add(1);
                    warn!("PUB: {}", e);
                    None
                }
            },
            None => None,
        };
        debug!("PUB: sample={} handle={:?}", sample, pushed_to);
        Tick {
            raw,
            sample,
            pushed_to,
        }
    }

    /// Publisher task body: feed `watchdog`, tick, then sleep one period,
    /// until `stop` fires.  Returns the number of ticks run.
    pub fn run(mut self, stop: &PublisherStop, watchdog: &mut TaskWatchdog) -> u32 {
        info!("PUB: task running (period={:?})", self.period);
        loop {
            watchdog.feed();
            self.tick();
            let stopped = block_on(or(
                async {
                    async_io_mini::Timer::after(self.period).await;
                    false
                },
                async {
                    stop.wait().await;
                    true
                },
            ));
            if stopped {
                break;
            }
        }
        info!(
            "PUB: task exiting after {} tick(s), {} push failure(s)",
            self.ticks, self.push_failures
        );
        self.ticks
    }
}
