//! Host platform capabilities
//!
//! The driver does not talk to any particular GPIO library or daemon. Instead a
//! [`Platform`] hands it three things:
//! - a [`Gpio`] service for digital line mode, pull, level and edge notification
//! - an `embedded-hal` [`SpiDevice`] opened on a given bus at a given clock rate,
//!   which provides chip-select framing for every transaction
//! - an `embedded-hal` [`DelayNs`] used to pace burst transmissions
//!
//! Pins use BCM numbering. Only GPIO 0 to 27 are addressable.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, PinState};
use embedded_hal::spi::SpiDevice;

use crate::config::{SpiBus, MAX_PIN};
use crate::error::{Unavailable, ValidationError};

/// A validated BCM GPIO number in the range 0..=27
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Pin(pub(crate) u8);

impl Pin {
    /// Creates a pin, rejecting numbers above 27
    pub const fn new(number: u8) -> Result<Self, ValidationError> {
        if number <= MAX_PIN {
            Ok(Self(number))
        } else {
            Err(ValidationError::PinOutOfRange(number as i64))
        }
    }

    /// The BCM GPIO number
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Pull direction the chip applies to this GPIO after reset.
    ///
    /// GPIO 0-8 default to pull-up, GPIO 9-27 to pull-down.
    pub const fn default_pull(self) -> Pull {
        if self.0 <= 8 {
            Pull::Up
        } else {
            Pull::Down
        }
    }
}

impl TryFrom<u8> for Pin {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Pin {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| ValidationError::PinOutOfRange(value))
            .and_then(Self::new)
    }
}

impl From<Pin> for u8 {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

/// Direction of a GPIO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input,
    Output,
}

/// Internal bias resistor of a GPIO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    Off,
    Down,
    Up,
}

/// Transitions an edge handler is armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
    Either,
}

/// Handler invoked by the platform on its notification context.
///
/// Receives the level the line changed to.
pub type EdgeHandler = Box<dyn FnMut(PinState) + Send + 'static>;

/// A registered edge notification
///
/// # Important Notes
/// - `cancel` must not wait for a handler invocation that is already running,
///   since the caller may hold state that the handler is waiting on
/// - After `cancel` returns the handler is never invoked again
pub trait Watch: Send {
    fn cancel(self);
}

/// Digital line service
///
/// Errors are reported through the `embedded-hal` digital error kinds.
pub trait Gpio: ErrorType + Send {
    type Watch: Watch + 'static;

    fn set_mode(&mut self, pin: Pin, mode: PinMode) -> Result<(), Self::Error>;

    fn set_pull(&mut self, pin: Pin, pull: Pull) -> Result<(), Self::Error>;

    fn write(&mut self, pin: Pin, level: PinState) -> Result<(), Self::Error>;

    fn read(&mut self, pin: Pin) -> Result<PinState, Self::Error>;

    /// Arms `handler` for the given transitions on `pin`.
    ///
    /// The handler runs asynchronously, never on the caller's context.
    fn watch(
        &mut self,
        pin: Pin,
        edge: Edge,
        handler: EdgeHandler,
    ) -> Result<Self::Watch, Self::Error>;
}

/// Access to the host's GPIO, SPI and timing services
pub trait Platform: 'static {
    type Gpio: Gpio + 'static;
    type Spi: SpiDevice + Send + 'static;
    type Delay: DelayNs + Send + 'static;

    /// Connects to the line service.
    ///
    /// Returns [`Unavailable`] when the service cannot be reached.
    fn gpio(&mut self) -> Result<Self::Gpio, Unavailable>;

    /// Opens SPI `bus` in mode 0, MSB first, at `clock_hz`.
    fn open_spi(&mut self, bus: SpiBus, clock_hz: u32) -> Result<Self::Spi, Unavailable>;

    /// Returns a bus handle obtained from [`open_spi`](Platform::open_spi).
    fn close_spi(&mut self, spi: Self::Spi) {
        drop(spi);
    }

    fn delay(&mut self) -> Self::Delay;
}
