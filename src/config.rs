//! Driver configuration and hardware constants
//!
//! Bus timing, register geometry and session defaults live here, along with
//! [`DriverConfig`], the set of options a session is opened with.

use crate::error::ValidationError;
use crate::platform::Pin;
use crate::registers::{Address, CrcMode};

/// SPI clock. The nRF905 accepts up to 10 MHz.
pub const SPI_CLOCK_HZ: u32 = 1_000_000;

/// Highest addressable BCM GPIO number
pub const MAX_PIN: u8 = 27;

/// Size of one ShockBurst transmission unit in bytes
pub const BURST_LEN: usize = 32;

/// Size of the RF configuration register in bytes
pub const CONFIG_REGISTER_LEN: usize = 10;

/// Crystal fitted to the module
pub const CRYSTAL_FREQUENCY_HZ: u32 = 16_000_000;

/// Upper bound on the wait for a burst to leave the antenna.
///
/// A 32 byte payload with 4 byte address and 16 bit CRC takes about 6.3 ms
/// on air at 50 kbps, plus 650 us for the PLL to settle.
pub const TRANSMIT_WINDOW_US: u32 = 8_000;

/// Interval between DR polls while waiting for a burst to complete
pub const POLL_INTERVAL_US: u32 = 100;

/// How long release waits for a running data-ready handler to let go of the
/// bus before giving up on closing it
pub const RELEASE_WAIT_MS: u32 = 500;

/// Chip reset value of the RX and TX address registers
pub const DEFAULT_ADDRESS: u32 = 0xE7E7_E7E7;

/// 433.2 MHz, inside the UK 433.05 - 434.79 MHz allocation
pub const DEFAULT_FREQUENCY_MHZ: f64 = 433.2;

pub const DEFAULT_CRC_MODE: CrcMode = CrcMode::Crc16;

/// SPI bus the module is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpiBus {
    /// Main SPI bus, present on every board
    #[default]
    Bus0 = 0,
    /// Auxiliary SPI bus
    Bus1 = 1,
}

impl SpiBus {
    pub const fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<i64> for SpiBus {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Bus0),
            1 => Ok(Self::Bus1),
            other => Err(ValidationError::BusOutOfRange(other)),
        }
    }
}

impl TryFrom<u8> for SpiBus {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i32> for SpiBus {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

/// GPIO assignment for the six nRF905 control and status lines
///
/// Defaults match a Raspberry Pi header wiring:
///
/// | Header | GPIO | nRF905 | Notes                          |
/// |--------|------|--------|--------------------------------|
/// | 11     | 17   | PWR_UP | 0 = power down, 1 = working    |
/// | 12     | 18   | DR     | 1 = data ready                 |
/// | 15     | 22   | TX_EN  | 0 = receive, 1 = transmit      |
/// | 16     | 23   | CD     | 1 = carrier detected           |
/// | 18     | 24   | AM     | 1 = address matched            |
/// | 22     | 25   | TRX_CE | 0 = disable, 1 = enable        |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinAssignment {
    pub power_up: Pin,
    pub transmit_enable: Pin,
    pub chip_enable: Pin,
    pub data_ready: Pin,
    pub carrier_detect: Pin,
    pub address_matched: Pin,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            power_up: Pin(17),
            transmit_enable: Pin(22),
            chip_enable: Pin(25),
            data_ready: Pin(18),
            carrier_detect: Pin(23),
            address_matched: Pin(24),
        }
    }
}

impl PinAssignment {
    /// Builds an assignment from raw GPIO numbers in the order
    /// PWR_UP, TX_EN, TRX_CE, DR, CD, AM.
    pub fn from_numbers(numbers: [u8; 6]) -> Result<Self, ValidationError> {
        let [power_up, transmit_enable, chip_enable, data_ready, carrier_detect, address_matched] =
            numbers;
        let pins = Self {
            power_up: Pin::new(power_up)?,
            transmit_enable: Pin::new(transmit_enable)?,
            chip_enable: Pin::new(chip_enable)?,
            data_ready: Pin::new(data_ready)?,
            carrier_detect: Pin::new(carrier_detect)?,
            address_matched: Pin::new(address_matched)?,
        };
        pins.validate()?;
        Ok(pins)
    }

    /// Output lines in the order PWR_UP, TRX_CE, TX_EN
    pub fn outputs(&self) -> [Pin; 3] {
        [self.power_up, self.chip_enable, self.transmit_enable]
    }

    /// Input lines in the order DR, CD, AM
    pub fn inputs(&self) -> [Pin; 3] {
        [self.data_ready, self.carrier_detect, self.address_matched]
    }

    /// Rejects assignments that wire two lines to the same GPIO
    pub fn validate(&self) -> Result<(), ValidationError> {
        let outputs = self.outputs();
        let inputs = self.inputs();
        let all: Vec<Pin> = outputs.iter().chain(inputs.iter()).copied().collect();
        for (i, pin) in all.iter().enumerate() {
            if all[i + 1..].contains(pin) {
                return Err(ValidationError::DuplicatePin(pin.number()));
            }
        }
        Ok(())
    }
}

/// Bound on the number of bytes held by the receive queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueBound {
    /// Limited only by available memory
    #[default]
    Unbounded,
    /// Bytes arriving while the queue holds this many are dropped and counted
    Bounded(usize),
}

/// Options a session is opened with
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverConfig {
    pub pins: PinAssignment,
    pub spi_bus: SpiBus,
    /// RX address written to the configuration register, also used as the
    /// TX address when transmitting
    pub address: Address,
    pub crc: CrcMode,
    /// Must match an entry of the preset table when the device is opened
    pub frequency_mhz: f64,
    pub queue_bound: QueueBound,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            pins: PinAssignment::default(),
            spi_bus: SpiBus::default(),
            address: Address::new(DEFAULT_ADDRESS),
            crc: DEFAULT_CRC_MODE,
            frequency_mhz: DEFAULT_FREQUENCY_MHZ,
            queue_bound: QueueBound::default(),
        }
    }
}
