//! In-memory platform for tests and demos
//!
//! [`MockPlatform`] hands out shared handles, so a test can keep a
//! [`MockGpio`], [`MockSpi`] and [`MockDelay`] for inspection after moving the
//! platform into a driver.
//!
//! [`MockSpi`] emulates the nRF905 register file: configuration writes land in
//! the configuration register, payload and address writes can be read back,
//! and payloads loaded with [`MockSpi::load_rx_payload`] are returned by
//! R_RX_PAYLOAD. Every transaction is recorded.
//!
//! Edge handlers do not run on a notification context of their own.
//! [`MockGpio::trigger`] invokes the armed handler synchronously on the thread
//! that calls it, while a real [`Gpio::watch`] implementation runs handlers
//! asynchronously. Tests that need the handler to overlap another operation
//! call `trigger` from a spawned thread.
//!
//! # Example
//!
//! ```
//! use embedded_hal::digital::PinState;
//! use nrf905::mock::MockPlatform;
//! use nrf905::{Nrf905, PinAssignment};
//!
//! let platform = MockPlatform::new();
//! let gpio = platform.gpio_handle();
//! let spi = platform.spi_handle();
//!
//! let mut radio = Nrf905::new(platform);
//! radio.open_receiver(|payload| println!("{payload:?}")).unwrap();
//!
//! spi.load_rx_payload(b"ping");
//! gpio.trigger(PinAssignment::default().data_ready, PinState::High);
//! assert_eq!(&radio.drain_received()[..4], b"ping");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, PinState};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::commands::{
    CHANNEL_CONFIG, R_CONFIG, R_RX_PAYLOAD, R_TX_ADDRESS, R_TX_PAYLOAD, W_CONFIG, W_TX_ADDRESS,
    W_TX_PAYLOAD,
};
use crate::config::{SpiBus, BURST_LEN, CONFIG_REGISTER_LEN};
use crate::error::Unavailable;
use crate::platform::{Edge, EdgeHandler, Gpio, Pin, PinMode, Platform, Pull, Watch};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Platform whose services live in memory
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    gpio: MockGpio,
    spi: MockSpi,
    delay: MockDelay,
    gpio_unavailable: bool,
    spi_unavailable: bool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform whose line service cannot be reached
    pub fn disconnected() -> Self {
        Self {
            gpio_unavailable: true,
            ..Self::default()
        }
    }

    /// A platform whose SPI bus cannot be opened
    pub fn without_spi() -> Self {
        Self {
            spi_unavailable: true,
            ..Self::default()
        }
    }

    pub fn gpio_handle(&self) -> MockGpio {
        self.gpio.clone()
    }

    pub fn spi_handle(&self) -> MockSpi {
        self.spi.clone()
    }

    pub fn delay_handle(&self) -> MockDelay {
        self.delay.clone()
    }
}

impl Platform for MockPlatform {
    type Gpio = MockGpio;
    type Spi = MockSpi;
    type Delay = MockDelay;

    fn gpio(&mut self) -> Result<Self::Gpio, Unavailable> {
        if self.gpio_unavailable {
            return Err(Unavailable("line service not running".into()));
        }
        Ok(self.gpio.clone())
    }

    fn open_spi(&mut self, bus: SpiBus, clock_hz: u32) -> Result<Self::Spi, Unavailable> {
        if self.spi_unavailable {
            return Err(Unavailable(format!("SPI bus {} not present", bus.index())));
        }
        lock(&self.spi.state).open = Some((bus, clock_hz));
        Ok(self.spi.clone())
    }

    fn close_spi(&mut self, spi: Self::Spi) {
        let mut state = lock(&spi.state);
        state.open = None;
        state.closes += 1;
    }

    fn delay(&mut self) -> Self::Delay {
        self.delay.clone()
    }
}

#[derive(Debug, Clone, Copy)]
struct PinRecord {
    mode: Option<PinMode>,
    pull: Option<Pull>,
    level: PinState,
}

impl Default for PinRecord {
    fn default() -> Self {
        Self {
            mode: None,
            pull: None,
            level: PinState::Low,
        }
    }
}

struct Registration {
    id: u64,
    edge: Edge,
    handler: Arc<Mutex<EdgeHandler>>,
}

#[derive(Default)]
struct GpioState {
    pins: HashMap<Pin, PinRecord>,
    watches: HashMap<Pin, Registration>,
    next_id: u64,
    writes: Vec<(Pin, PinState)>,
    cancel_delay: Option<Duration>,
    failing: bool,
}

impl GpioState {
    fn check(&self) -> Result<(), digital::ErrorKind> {
        if self.failing {
            Err(digital::ErrorKind::Other)
        } else {
            Ok(())
        }
    }
}

/// Line service handle. Clones share state.
#[derive(Clone, Default)]
pub struct MockGpio {
    state: Arc<Mutex<GpioState>>,
}

impl core::fmt::Debug for MockGpio {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockGpio")
            .field("pins", &state.pins)
            .field("watched", &state.watches.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MockGpio {
    /// Drives `pin` to `level` from outside and runs its edge handler, if one
    /// is armed for that transition.
    ///
    /// The handler runs synchronously on the calling thread, without the
    /// service's lock held, and `trigger` returns once it has finished. A
    /// platform's own handlers run on a separate notification context.
    pub fn trigger(&self, pin: Pin, level: PinState) {
        let armed = {
            let mut state = lock(&self.state);
            state.pins.entry(pin).or_default().level = level;
            state.watches.get(&pin).and_then(|registration| {
                let fires = match registration.edge {
                    Edge::Either => true,
                    Edge::Rising => level == PinState::High,
                    Edge::Falling => level == PinState::Low,
                };
                fires.then(|| (registration.id, Arc::clone(&registration.handler)))
            })
        };
        let Some((id, handler)) = armed else {
            return;
        };
        let mut handler = lock(&handler);
        let still_armed = lock(&self.state)
            .watches
            .get(&pin)
            .is_some_and(|registration| registration.id == id);
        if still_armed {
            (*handler)(level);
        }
    }

    /// Sets the level seen by `read` without running any handler.
    pub fn set_level(&self, pin: Pin, level: PinState) {
        lock(&self.state).pins.entry(pin).or_default().level = level;
    }

    pub fn level(&self, pin: Pin) -> PinState {
        lock(&self.state)
            .pins
            .get(&pin)
            .map_or(PinState::Low, |record| record.level)
    }

    /// Last mode set on `pin`, `None` if never touched
    pub fn mode(&self, pin: Pin) -> Option<PinMode> {
        lock(&self.state).pins.get(&pin).and_then(|record| record.mode)
    }

    /// Last pull set on `pin`, `None` if never touched
    pub fn pull(&self, pin: Pin) -> Option<Pull> {
        lock(&self.state).pins.get(&pin).and_then(|record| record.pull)
    }

    pub fn is_watched(&self, pin: Pin) -> bool {
        lock(&self.state).watches.contains_key(&pin)
    }

    /// Every level written through [`Gpio::write`], oldest first
    pub fn writes(&self) -> Vec<(Pin, PinState)> {
        lock(&self.state).writes.clone()
    }

    pub fn clear_writes(&self) {
        lock(&self.state).writes.clear();
    }

    /// Makes every subsequent operation fail
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    /// Makes [`Watch::cancel`] take `delay` before the handler is disarmed.
    /// Triggers in that time still run the handler.
    pub fn set_cancel_delay(&self, delay: Duration) {
        lock(&self.state).cancel_delay = Some(delay);
    }
}

impl digital::ErrorType for MockGpio {
    type Error = digital::ErrorKind;
}

impl Gpio for MockGpio {
    type Watch = MockWatch;

    fn set_mode(&mut self, pin: Pin, mode: PinMode) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        state.check()?;
        state.pins.entry(pin).or_default().mode = Some(mode);
        Ok(())
    }

    fn set_pull(&mut self, pin: Pin, pull: Pull) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        state.check()?;
        state.pins.entry(pin).or_default().pull = Some(pull);
        Ok(())
    }

    fn write(&mut self, pin: Pin, level: PinState) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        state.check()?;
        state.pins.entry(pin).or_default().level = level;
        state.writes.push((pin, level));
        Ok(())
    }

    fn read(&mut self, pin: Pin) -> Result<PinState, Self::Error> {
        let state = lock(&self.state);
        state.check()?;
        Ok(state.pins.get(&pin).map_or(PinState::Low, |record| record.level))
    }

    fn watch(
        &mut self,
        pin: Pin,
        edge: Edge,
        handler: EdgeHandler,
    ) -> Result<Self::Watch, Self::Error> {
        let mut state = lock(&self.state);
        state.check()?;
        let id = state.next_id;
        state.next_id += 1;
        state.watches.insert(
            pin,
            Registration {
                id,
                edge,
                handler: Arc::new(Mutex::new(handler)),
            },
        );
        Ok(MockWatch {
            state: Arc::clone(&self.state),
            pin,
            id,
        })
    }
}

/// Edge notification registered on a [`MockGpio`]
pub struct MockWatch {
    state: Arc<Mutex<GpioState>>,
    pin: Pin,
    id: u64,
}

impl Watch for MockWatch {
    fn cancel(self) {
        let delay = lock(&self.state).cancel_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let mut state = lock(&self.state);
        if state
            .watches
            .get(&self.pin)
            .is_some_and(|registration| registration.id == self.id)
        {
            state.watches.remove(&self.pin);
        }
    }
}

/// One recorded SPI transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub instruction: u8,
    /// Bytes clocked in after the instruction byte
    pub written: Vec<u8>,
    /// Bytes clocked out after the instruction byte
    pub read: Vec<u8>,
}

#[derive(Debug)]
struct SpiState {
    config: [u8; CONFIG_REGISTER_LEN],
    tx_payload: [u8; BURST_LEN],
    tx_address: [u8; 4],
    rx_payloads: VecDeque<[u8; BURST_LEN]>,
    status: u8,
    failing: bool,
    transactions: Vec<Transaction>,
    open: Option<(SpiBus, u32)>,
    closes: usize,
}

impl Default for SpiState {
    fn default() -> Self {
        Self {
            // Power-on contents of the configuration register
            config: [0x6C, 0x00, 0x44, 0x20, 0x20, 0xE7, 0xE7, 0xE7, 0xE7, 0xE7],
            tx_payload: [0; BURST_LEN],
            tx_address: [0xE7; 4],
            rx_payloads: VecDeque::new(),
            status: 0,
            failing: false,
            transactions: Vec::new(),
            open: None,
            closes: 0,
        }
    }
}

impl SpiState {
    fn register_contents(&mut self, instruction: u8) -> Vec<u8> {
        match instruction {
            i if i & 0xF0 == R_CONFIG => {
                let start = usize::from(i & 0x0F).min(CONFIG_REGISTER_LEN);
                self.config[start..].to_vec()
            }
            R_TX_PAYLOAD => self.tx_payload.to_vec(),
            R_TX_ADDRESS => self.tx_address.to_vec(),
            R_RX_PAYLOAD => self
                .rx_payloads
                .pop_front()
                .unwrap_or([0; BURST_LEN])
                .to_vec(),
            _ => Vec::new(),
        }
    }

    fn store(&mut self, instruction: u8, written: &[u8]) {
        fn copy_into(target: &mut [u8], start: usize, bytes: &[u8]) {
            let start = start.min(target.len());
            let len = bytes.len().min(target.len() - start);
            target[start..start + len].copy_from_slice(&bytes[..len]);
        }

        match instruction {
            i if i & CHANNEL_CONFIG != 0 => {
                self.config[1] = (self.config[1] & 0xF0) | (i & 0x0F);
                if let Some(channel_low) = written.first() {
                    self.config[0] = *channel_low;
                }
            }
            i if i & 0xF0 == W_CONFIG => copy_into(&mut self.config, usize::from(i & 0x0F), written),
            W_TX_PAYLOAD => copy_into(&mut self.tx_payload, 0, written),
            W_TX_ADDRESS => copy_into(&mut self.tx_address, 0, written),
            _ => {}
        }
    }
}

/// SPI device emulating the nRF905 register file. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockSpi {
    state: Arc<Mutex<SpiState>>,
}

impl MockSpi {
    /// All transactions so far, oldest first
    pub fn transactions(&self) -> Vec<Transaction> {
        lock(&self.state).transactions.clone()
    }

    /// Transactions that used `instruction`
    pub fn transactions_with(&self, instruction: u8) -> Vec<Transaction> {
        lock(&self.state)
            .transactions
            .iter()
            .filter(|transaction| transaction.instruction == instruction)
            .cloned()
            .collect()
    }

    pub fn clear_transactions(&self) {
        lock(&self.state).transactions.clear();
    }

    /// Status byte clocked out with every instruction
    pub fn set_status(&self, status: u8) {
        lock(&self.state).status = status;
    }

    /// Queues a payload for the next R_RX_PAYLOAD, zero filled to 32 bytes
    pub fn load_rx_payload(&self, payload: &[u8]) {
        let mut burst = [0u8; BURST_LEN];
        let len = payload.len().min(BURST_LEN);
        burst[..len].copy_from_slice(&payload[..len]);
        lock(&self.state).rx_payloads.push_back(burst);
    }

    pub fn config_register(&self) -> [u8; CONFIG_REGISTER_LEN] {
        lock(&self.state).config
    }

    pub fn tx_payload(&self) -> [u8; BURST_LEN] {
        lock(&self.state).tx_payload
    }

    pub fn tx_address(&self) -> [u8; 4] {
        lock(&self.state).tx_address
    }

    /// Bus and clock rate the device is currently opened with
    pub fn open_bus(&self) -> Option<(SpiBus, u32)> {
        lock(&self.state).open
    }

    /// Number of times the device was handed back to the platform
    pub fn close_count(&self) -> usize {
        lock(&self.state).closes
    }

    /// Makes every subsequent transaction fail
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}

impl spi::ErrorType for MockSpi {
    type Error = spi::ErrorKind;
}

impl SpiDevice for MockSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(spi::ErrorKind::Other);
        }

        let mut instruction = None;
        let mut written = Vec::new();
        let mut read = Vec::new();
        let mut contents = VecDeque::new();

        for operation in operations.iter_mut() {
            match operation {
                Operation::Transfer(input, output) => {
                    if let (None, Some(first)) = (instruction, output.first()) {
                        instruction = Some(*first);
                        contents = state.register_contents(*first).into();
                        if let Some(status) = input.first_mut() {
                            *status = state.status;
                        }
                    }
                }
                Operation::Write(bytes) => written.extend_from_slice(bytes),
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = contents.pop_front().unwrap_or(0);
                        read.push(*byte);
                    }
                }
                Operation::TransferInPlace(buffer) => {
                    if let (None, Some(first)) = (instruction, buffer.first_mut()) {
                        instruction = Some(*first);
                        contents = state.register_contents(*first).into();
                        *first = state.status;
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }

        let instruction = instruction.ok_or(spi::ErrorKind::Other)?;
        state.store(instruction, &written);
        state.transactions.push(Transaction {
            instruction,
            written,
            read,
        });
        Ok(())
    }
}

/// Delay that returns immediately and accumulates the requested time
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    elapsed_ns: Arc<AtomicU64>,
}

impl MockDelay {
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns.load(Ordering::Relaxed) / 1_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.fetch_add(u64::from(ns), Ordering::Relaxed);
    }
}
