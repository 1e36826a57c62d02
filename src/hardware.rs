//! Hardware orchestration
//!
//! Sequences the line controller and register device into the nRF905
//! transmit and receive procedures:
//!
//! ```text
//! transmit, per 32 byte burst:
//!   Standby -> W_TX_PAYLOAD -> Transmit -> DR high or window elapsed -> Standby
//!
//! receive:
//!   Standby -> arm DR -> write RX address -> Receive
//!   on DR rising: Standby -> R_RX_PAYLOAD -> Receive -> queue -> callback
//! ```
//!
//! The line controller, the SPI device and the delay share one lock. The
//! data-ready handler takes that lock on the notification context, so every
//! bus and line sequence runs to completion before another one starts.
//!
//! Release marks the shared state as released under that same lock. A
//! handler that was already waiting for the lock then finds nothing to do,
//! so it never drives the lines or touches the bus after the lines are reset.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use tracing::{debug, info, warn};

use crate::config::{
    PinAssignment, QueueBound, SpiBus, BURST_LEN, POLL_INTERVAL_US, RELEASE_WAIT_MS,
    SPI_CLOCK_HZ, TRANSMIT_WINDOW_US,
};
use crate::commands::Status;
use crate::device::Device;
use crate::error::{Error, StateError};
use crate::lines::{Line, LineController, OperatingMode};
use crate::platform::{EdgeHandler, Platform};
use crate::queue::ReceiveQueue;
use crate::registers::{Address, ConfigurationRegister};

/// Invoked with every payload delivered in receive mode.
///
/// Runs on the platform's notification context, after the bytes have been
/// appended to the receive queue.
pub type PayloadCallback = Box<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Everything touched by a bus or line sequence
struct Io<P: Platform> {
    lines: LineController<P::Gpio>,
    device: Device<P::Spi>,
    delay: P::Delay,
    released: bool,
}

impl<P: Platform> Io<P> {
    fn send_burst(&mut self, burst: &[u8]) -> Result<(), Error> {
        self.lines.apply_mode(OperatingMode::Standby)?;
        self.device.write_transmit_payload(burst)?;
        self.lines.apply_mode(OperatingMode::Transmit)?;
        self.wait_for_transmission()?;
        self.lines.apply_mode(OperatingMode::Standby)
    }

    /// Polls DR until the chip reports the burst sent, for at most
    /// [`TRANSMIT_WINDOW_US`].
    fn wait_for_transmission(&mut self) -> Result<bool, Error> {
        let mut waited = 0;
        loop {
            if self.lines.read(Line::DataReady)? == PinState::High {
                return Ok(true);
            }
            if waited >= TRANSMIT_WINDOW_US {
                debug!(waited_us = waited, "transmission window elapsed");
                return Ok(false);
            }
            self.delay.delay_us(POLL_INTERVAL_US);
            waited += POLL_INTERVAL_US;
        }
    }

    fn read_payload(&mut self) -> Result<Vec<u8>, Error> {
        self.lines.apply_mode(OperatingMode::Standby)?;
        let payload = self.device.read_receive_payload();
        self.lines.apply_mode(OperatingMode::Receive)?;
        Ok(payload)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reads one payload and queues it.
///
/// The payload is queued while the I/O lock is still held so bytes land in
/// the order the chip delivered them. Returns an empty payload once the
/// hardware has been released.
fn read_and_queue<P: Platform>(
    io: &Mutex<Io<P>>,
    queue: &ReceiveQueue,
) -> Result<Vec<u8>, Error> {
    let mut io = lock(io);
    if io.released {
        return Ok(Vec::new());
    }
    let payload = io.read_payload()?;
    queue.push(&payload);
    Ok(payload)
}

/// Hands a queued payload to `callback`. Call without the I/O lock held.
fn notify(payload: &[u8], callback: Option<&PayloadCallback>) -> usize {
    if payload.is_empty() {
        return 0;
    }
    debug!(len = payload.len(), "payload received");
    if let Some(callback) = callback {
        callback(payload);
    }
    payload.len()
}

/// Drives one nRF905 on the services of a [`Platform`]
pub struct Hardware<P: Platform> {
    platform: P,
    io: Option<Arc<Mutex<Io<P>>>>,
    queue: Arc<ReceiveQueue>,
    callback: Option<Arc<PayloadCallback>>,
}

impl<P: Platform> Hardware<P> {
    pub fn new(platform: P, bound: QueueBound) -> Self {
        Self {
            platform,
            io: None,
            queue: Arc::new(ReceiveQueue::new(bound)),
            callback: None,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn is_prepared(&self) -> bool {
        self.io.is_some()
    }

    pub fn queue(&self) -> &ReceiveQueue {
        &self.queue
    }

    fn io(&self) -> Result<&Arc<Mutex<Io<P>>>, Error> {
        self.io.as_ref().ok_or(Error::State(StateError::NotOpen))
    }

    /// Acquires the line service and SPI bus and powers the chip down.
    ///
    /// Anything held from an earlier `prepare` is released first. The receive
    /// queue is emptied.
    ///
    /// # Errors
    /// * `Error::HardwareUnavailable` - the line service or bus could not be
    ///   reached. Nothing is held afterwards.
    pub fn prepare(&mut self, bus: SpiBus, pins: PinAssignment) -> Result<(), Error> {
        self.release()?;

        let gpio = self.platform.gpio()?;
        let mut lines = LineController::new(gpio, pins)?;
        lines.apply_mode(OperatingMode::PowerDown)?;

        let spi = match self.platform.open_spi(bus, SPI_CLOCK_HZ) {
            Ok(spi) => spi,
            Err(err) => {
                if let Err(term_err) = lines.term() {
                    warn!("releasing lines after failed bus open: {term_err}");
                }
                return Err(err.into());
            }
        };
        let delay = self.platform.delay();

        self.queue.clear();
        self.io = Some(Arc::new(Mutex::new(Io {
            lines,
            device: Device::new(spi),
            delay,
            released: false,
        })));
        info!(bus = bus.index(), clock_hz = SPI_CLOCK_HZ, "hardware prepared");
        Ok(())
    }

    /// Writes the full configuration register.
    pub fn configure(&self, register: &ConfigurationRegister) -> Result<(), Error> {
        lock(self.io()?).device.write_configuration_register(register)?;
        debug!("configuration register written");
        Ok(())
    }

    pub fn write_transmit_address(&self, address: Address) -> Result<(), Error> {
        lock(self.io()?).device.write_transmit_address(address)
    }

    /// Drives the output lines for `mode`.
    pub fn set_mode(&self, mode: OperatingMode) -> Result<(), Error> {
        lock(self.io()?).lines.apply_mode(mode)
    }

    /// Sends `payload` as consecutive 32 byte bursts and returns the number of
    /// bursts sent. The last burst is zero filled.
    pub fn transmit(&self, payload: &[u8]) -> Result<usize, Error> {
        let mut io = lock(self.io()?);
        let mut bursts = 0;
        for burst in payload.chunks(BURST_LEN) {
            io.send_burst(burst)?;
            bursts += 1;
        }
        debug!(len = payload.len(), bursts, "payload transmitted");
        Ok(bursts)
    }

    /// Arms the data-ready handler, programs the RX address and enters
    /// receive mode.
    pub fn begin_receive(
        &mut self,
        address: Address,
        callback: Option<PayloadCallback>,
    ) -> Result<(), Error> {
        let io = Arc::clone(self.io()?);
        let callback = callback.map(Arc::new);
        let handler = data_ready_handler(
            Arc::downgrade(&io),
            Arc::clone(&self.queue),
            callback.clone(),
        );
        self.callback = callback;

        let mut io = lock(&io);
        io.lines.apply_mode(OperatingMode::Standby)?;
        io.lines.register_notification(Line::DataReady, handler)?;
        io.device.write_receive_address(address)?;
        io.lines.apply_mode(OperatingMode::Receive)?;
        info!(%address, "receiving");
        Ok(())
    }

    /// Reads a pending payload from the foreground, exactly as the data-ready
    /// handler does. Returns the number of bytes queued.
    pub fn on_data_ready(&self) -> Result<usize, Error> {
        let payload = read_and_queue(self.io()?, &self.queue)?;
        Ok(notify(&payload, self.callback.as_deref()))
    }

    /// Takes everything received so far, oldest byte first.
    pub fn drain_received(&self) -> Vec<u8> {
        self.queue.drain()
    }

    /// Status byte from the most recent bus transaction
    pub fn status(&self) -> Option<Status> {
        self.io
            .as_ref()
            .map(|io| lock(io).device.status())
    }

    /// Reads back the configuration register.
    pub fn read_configuration(&self) -> Option<[u8; 10]> {
        self.io
            .as_ref()
            .and_then(|io| lock(io).device.read_configuration())
    }

    /// Cancels notifications, resets every line and hands the bus back to
    /// the platform. Does nothing when not prepared.
    ///
    /// A data-ready handler that fires while the lines are being released
    /// returns without touching them. Its hold on the shared state is awaited
    /// for up to [`RELEASE_WAIT_MS`] so the bus still reaches
    /// [`Platform::close_spi`].
    pub fn release(&mut self) -> Result<(), Error> {
        let Some(mut io) = self.io.take() else {
            return Ok(());
        };
        self.callback = None;

        let result = {
            let mut io = lock(&io);
            io.released = true;
            io.lines.term()
        };

        let mut waited = 0;
        let io = loop {
            match Arc::try_unwrap(io) {
                Ok(io) => break Some(io),
                Err(shared) if waited < RELEASE_WAIT_MS => {
                    io = shared;
                    waited += 1;
                    thread::sleep(Duration::from_millis(1));
                }
                Err(_) => break None,
            }
        };
        match io {
            Some(io) => {
                let Io { lines, device, .. } =
                    io.into_inner().unwrap_or_else(PoisonError::into_inner);
                drop(lines.release());
                self.platform.close_spi(device.release());
            }
            None => warn!(
                waited_ms = waited,
                "data-ready handler still holds the bus, it is dropped when the handler returns"
            ),
        }
        info!("hardware released");
        result
    }
}

fn data_ready_handler<P: Platform>(
    io: Weak<Mutex<Io<P>>>,
    queue: Arc<ReceiveQueue>,
    callback: Option<Arc<PayloadCallback>>,
) -> EdgeHandler {
    Box::new(move |level| {
        if level != PinState::High {
            return;
        }
        let payload = match io.upgrade() {
            Some(io) => read_and_queue(&io, &queue),
            None => return,
        };
        match payload {
            Ok(payload) => {
                notify(&payload, callback.as_deref());
            }
            Err(err) => warn!("data-ready handling failed: {err}"),
        }
    })
}
