//! Error types for the nRF905 driver
//!
//! Every fallible operation returns [`Error`]. Callers branch on the variant:
//! - [`Error::Validation`]: a parameter was malformed. Detected before any bus
//!   or line I/O, never retried.
//! - [`Error::State`]: the call is illegal in the current session state. The
//!   caller must reorder its calls.
//! - [`Error::HardwareUnavailable`]: the line or bus service could not be
//!   reached while opening. Fatal for that session.
//! - [`Error::Bus`] / [`Error::Line`]: an SPI or GPIO operation failed.

use core::convert::Infallible;

use embedded_hal::{digital, spi};
use regiface::errors::Error as RegifaceError;
use thiserror::Error;

use crate::transceiver::Role;

/// Malformed parameter errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A register image did not have the required length
    #[error("register data must contain {expected} bytes, got {actual}")]
    RegisterLength { expected: usize, actual: usize },

    /// SPI bus index other than 0 or 1
    #[error("SPI bus {0} out of range, must be 0 or 1")]
    BusOutOfRange(i64),

    /// Address outside the unsigned 32-bit range
    #[error("address {0} out of range, must fit in 32 bits unsigned")]
    AddressOutOfRange(i64),

    /// Address given as a value with a fractional part
    #[error("address {0} is not an integer")]
    AddressNotIntegral(f64),

    /// CRC width other than 0, 8 or 16
    #[error("CRC mode must be one of 0, 8, 16, got {0}")]
    CrcWidth(i64),

    /// No preset matches the requested frequency exactly
    #[error("frequency {0} MHz not found in the preset table")]
    UnresolvedFrequency(f64),

    /// GPIO number outside 0..=27
    #[error("GPIO {0} out of range, must be 0 to 27")]
    PinOutOfRange(i64),

    /// The same GPIO was assigned to two lines
    #[error("GPIO {0} assigned to more than one line")]
    DuplicatePin(u8),

    /// Edge notifications are only available on DR, CD and AM
    #[error("{0:?} is not a notification line")]
    NotNotificationLine(crate::lines::Line),

    /// A burst longer than the transmit payload width
    #[error("payload of {actual} bytes exceeds the {max} byte burst")]
    PayloadTooLong { max: usize, actual: usize },

    /// A register field held a value with no documented meaning
    #[error("register field {field} holds undefined value {value:#04x}")]
    UndefinedField { field: &'static str, value: u8 },
}

/// Operation illegal in the current session state
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// A setting was changed while the device is open
    #[error("{setting} NOT set. Device in use.")]
    DeviceInUse { setting: &'static str },

    /// `write` before `open`
    #[error("device not ready, call open() first")]
    NotOpen,

    /// `write` while open as a receiver
    #[error("device in receive mode")]
    ReceiveMode,

    /// `open` in one role while open in the other
    #[error("device open as {open:?}, cannot open as {requested:?}")]
    RoleConflict { open: Role, requested: Role },
}

/// The platform's line or bus service could not be reached
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct Unavailable(pub String);

/// Driver error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(#[from] Unavailable),

    #[error("SPI transfer failed: {0:?}")]
    Bus(spi::ErrorKind),

    #[error("GPIO operation failed: {0:?}")]
    Line(digital::ErrorKind),

    #[error("register access failed: {0:?}")]
    Register(RegifaceError),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl Error {
    /// Maps any `embedded-hal` SPI error into [`Error::Bus`]
    pub(crate) fn bus<E: spi::Error>(err: E) -> Self {
        Self::Bus(err.kind())
    }

    /// Maps any `embedded-hal` digital error into [`Error::Line`]
    pub(crate) fn line<E: digital::Error>(err: E) -> Self {
        Self::Line(err.kind())
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
