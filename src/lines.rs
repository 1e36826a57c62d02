//! Control and status lines
//!
//! The nRF905 is steered by three output lines and reports through three
//! input lines:
//!
//! | Line   | Direction | Meaning                                   |
//! |--------|-----------|-------------------------------------------|
//! | PWR_UP | out       | 0 = power down, 1 = powered               |
//! | TRX_CE | out       | 0 = radio idle, 1 = radio active          |
//! | TX_EN  | out       | 0 = receive, 1 = transmit                 |
//! | DR     | in        | data ready / transmission complete        |
//! | CD     | in        | carrier detected                          |
//! | AM     | in        | address matched                           |
//!
//! The nRF905 only drives the input lines while the radio is active, so edge
//! notifications can be armed once and left in place.

use std::collections::HashMap;

use embedded_hal::digital::PinState;
use tracing::debug;

use crate::config::PinAssignment;
use crate::error::{Error, ValidationError};
use crate::platform::{Edge, EdgeHandler, Gpio, Pin, PinMode, Pull, Watch};

/// One of the six nRF905 lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    PowerUp,
    ChipEnable,
    TransmitEnable,
    DataReady,
    CarrierDetect,
    AddressMatched,
}

impl Line {
    /// Lines that can carry an edge notification
    pub const NOTIFICATION_LINES: [Line; 3] =
        [Line::DataReady, Line::CarrierDetect, Line::AddressMatched];

    pub const fn is_input(self) -> bool {
        matches!(
            self,
            Line::DataReady | Line::CarrierDetect | Line::AddressMatched
        )
    }

    /// The GPIO this line is wired to under `pins`
    pub const fn pin(self, pins: &PinAssignment) -> Pin {
        match self {
            Line::PowerUp => pins.power_up,
            Line::ChipEnable => pins.chip_enable,
            Line::TransmitEnable => pins.transmit_enable,
            Line::DataReady => pins.data_ready,
            Line::CarrierDetect => pins.carrier_detect,
            Line::AddressMatched => pins.address_matched,
        }
    }
}

/// Operating mode selected by the output lines (datasheet table 11)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// Everything off, registers retained
    PowerDown,
    /// Crystal running, registers and payloads accessible
    Standby,
    /// ShockBurst receive
    Receive,
    /// ShockBurst transmit
    Transmit,
}

impl OperatingMode {
    /// Output levels as `(PWR_UP, TRX_CE, TX_EN)`
    pub const fn levels(self) -> (bool, bool, bool) {
        match self {
            Self::PowerDown => (false, false, false),
            Self::Standby => (true, false, false),
            Self::Receive => (true, true, false),
            Self::Transmit => (true, true, true),
        }
    }
}

/// Owner of the six nRF905 lines on a [`Gpio`] service
///
/// Holds at most one edge notification per input line.
pub struct LineController<G: Gpio> {
    gpio: G,
    pins: PinAssignment,
    watches: HashMap<Line, G::Watch>,
    mode: OperatingMode,
}

impl<G: Gpio> LineController<G> {
    /// Takes ownership of `gpio` and puts the outputs into power down.
    pub fn new(gpio: G, pins: PinAssignment) -> Result<Self, Error> {
        let mut lines = Self {
            gpio,
            pins,
            watches: HashMap::new(),
            mode: OperatingMode::PowerDown,
        };
        lines.initialize()?;
        Ok(lines)
    }

    pub fn pins(&self) -> &PinAssignment {
        &self.pins
    }

    /// Mode most recently applied
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Drives all three outputs low as outputs. Input lines are left alone
    /// until a notification is registered on them.
    pub fn initialize(&mut self) -> Result<(), Error> {
        for pin in self.pins.outputs() {
            self.gpio.set_mode(pin, PinMode::Output).map_err(Error::line)?;
            self.gpio.write(pin, PinState::Low).map_err(Error::line)?;
        }
        self.mode = OperatingMode::PowerDown;
        Ok(())
    }

    /// Sets `PWR_UP`, `TRX_CE` and `TX_EN` for `mode`.
    pub fn apply_mode(&mut self, mode: OperatingMode) -> Result<(), Error> {
        let (power, chip_enable, transmit_enable) = mode.levels();
        self.write(Line::PowerUp, power)?;
        self.write(Line::ChipEnable, chip_enable)?;
        self.write(Line::TransmitEnable, transmit_enable)?;
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "operating mode");
        }
        self.mode = mode;
        Ok(())
    }

    fn write(&mut self, line: Line, high: bool) -> Result<(), Error> {
        self.gpio
            .write(line.pin(&self.pins), PinState::from(high))
            .map_err(Error::line)
    }

    /// Current level of any managed line
    pub fn read(&mut self, line: Line) -> Result<PinState, Error> {
        self.gpio.read(line.pin(&self.pins)).map_err(Error::line)
    }

    /// Arms `handler` on both edges of an input line.
    ///
    /// The line becomes an input with its pull resistor disabled, which is
    /// what the nRF905 module needs to drive it. A handler already registered
    /// on the line is cancelled first.
    ///
    /// # Errors
    /// * `ValidationError::NotNotificationLine` - `line` is an output
    pub fn register_notification(&mut self, line: Line, handler: EdgeHandler) -> Result<(), Error> {
        if !line.is_input() {
            return Err(ValidationError::NotNotificationLine(line).into());
        }
        if let Some(previous) = self.watches.remove(&line) {
            previous.cancel();
        }
        let pin = line.pin(&self.pins);
        self.gpio.set_mode(pin, PinMode::Input).map_err(Error::line)?;
        self.gpio.set_pull(pin, Pull::Off).map_err(Error::line)?;
        let watch = self
            .gpio
            .watch(pin, Edge::Either, handler)
            .map_err(Error::line)?;
        self.watches.insert(line, watch);
        debug!(?line, pin = pin.number(), "notification registered");
        Ok(())
    }

    /// Cancels the handler on `line` and returns the line to its reset state.
    ///
    /// Returns `false` if no handler was registered.
    pub fn clear_notification(&mut self, line: Line) -> Result<bool, Error> {
        match self.watches.remove(&line) {
            Some(watch) => {
                watch.cancel();
                self.reset_line(line.pin(&self.pins))?;
                debug!(?line, "notification cleared");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Makes `pin` an input with the pull the chip applies after reset.
    ///
    /// GPIO 0-8 are pulled up, GPIO 9-27 pulled down.
    pub fn reset_line(&mut self, pin: Pin) -> Result<(), Error> {
        self.gpio.set_mode(pin, PinMode::Input).map_err(Error::line)?;
        self.gpio
            .set_pull(pin, pin.default_pull())
            .map_err(Error::line)
    }

    /// Releases every line: handlers are cancelled, then inputs and outputs
    /// are reset. Safe to call repeatedly.
    pub fn term(&mut self) -> Result<(), Error> {
        for line in Line::NOTIFICATION_LINES {
            self.clear_notification(line)?;
            self.reset_line(line.pin(&self.pins))?;
        }
        for pin in self.pins.outputs() {
            self.reset_line(pin)?;
        }
        self.mode = OperatingMode::PowerDown;
        Ok(())
    }

    /// Gives back the GPIO service. Call [`term`](LineController::term) first.
    pub fn release(mut self) -> G {
        for (_, watch) in self.watches.drain() {
            watch.cancel();
        }
        self.gpio
    }
}
