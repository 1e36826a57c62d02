//! nRF905 Radio Driver
//!
//! This crate provides a type-safe control stack for the Nordic nRF905
//! single chip 433/868/915 MHz transceiver. The nRF905 is a half-duplex
//! ShockBurst radio: it either transmits or receives fixed size bursts, never
//! both at once.
//!
//! # Features
//! - Frequency bands: 430-440 MHz, 862-876 MHz and 902-928 MHz
//! - Modulation: GFSK, 50 kbps Manchester encoded
//! - Output power: -10 to +10 dBm
//! - Automatic address matching, CRC generation and checking
//! - 32 byte payload bursts, longer messages split across bursts
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`transceiver`]: The [`Nrf905`] session, the main entry point
//!   - Holds settings while closed, opens as transmitter or receiver
//!   - Delivers received payloads to a callback and a receive queue
//!
//! - [`hardware`]: Transmit and receive sequencing
//!   - Combines the line controller and register device
//!   - Services the data-ready notification
//!
//! - [`lines`]: The PWR_UP, TRX_CE and TX_EN outputs and the DR, CD and AM
//!   inputs, and the operating mode they select
//!
//! - [`device`]: Register level access over SPI
//!
//! - [`registers`]: Configuration register layout, addresses and the
//!   frequency preset table
//!
//! - [`commands`]: The SPI instruction set
//!
//! - [`platform`]: The GPIO, SPI and delay services a host provides
//!
//! # Usage
//! The driver uses the `regiface` crate to provide a type-safe interface
//! for command execution and `embedded-hal` for SPI and timing. A host
//! implements [`Platform`] and hands it to [`Nrf905`].
//!
//! Operation follows a specific sequence:
//!
//! 1. Create a new [`Nrf905`] with your platform
//! 2. Set pins, bus, address, CRC mode and frequency as needed
//! 3. Open as a transmitter, or as a receiver with a payload callback
//! 4. Write payloads, or collect them from the callback or [`Nrf905::drain_received`]
//! 5. Close to release the lines and the bus
//!
//! # Important Notes
//! - Settings can only be changed while the session is closed
//! - The frequency must match an entry of [`FREQUENCY_PRESETS`] exactly
//! - Both ends must agree on address, CRC mode and frequency
//! - Received bursts always carry 32 bytes, including any zero fill
//!
//! # Example
//! ```no_run
//! use nrf905::{Error, Nrf905, Platform};
//!
//! fn listen<P: Platform>(platform: P) -> Result<Nrf905<P>, Error> {
//!     let mut radio = Nrf905::new(platform);
//!     radio.set_frequency(433.2)?;
//!     radio.set_crc_mode(16u8)?;
//!
//!     radio.open_receiver(|payload| println!("received {payload:02x?}"))?;
//!
//!     Ok(radio)
//! }
//! ```

pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod hardware;
pub mod lines;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod platform;
pub mod queue;
pub mod registers;
pub mod transceiver;

pub use commands::Status;
pub use config::{DriverConfig, PinAssignment, QueueBound, SpiBus};
pub use device::Device;
pub use error::{Error, Result, StateError, Unavailable, ValidationError};
pub use hardware::{Hardware, PayloadCallback};
pub use lines::{Line, LineController, OperatingMode};
pub use platform::{Edge, EdgeHandler, Gpio, Pin, PinMode, Platform, Pull, Watch};
pub use queue::ReceiveQueue;
pub use registers::*;
pub use transceiver::{Nrf905, Role};
