//! Session controller
//!
//! [`Nrf905`] is the user-facing handle. A session is either closed or open in
//! exactly one [`Role`]:
//!
//! ```text
//!            open(None)                 open(Some(callback))
//! Transmitter <---------- Closed ----------> Receiver
//!      |                    ^                    |
//!      +------ close() -----+------ close() -----+
//! ```
//!
//! Settings can only be changed while closed. They take effect on the next
//! `open`.

use tracing::{debug, info, warn};

use crate::commands::Status;
use crate::config::{DriverConfig, PinAssignment, SpiBus, CONFIG_REGISTER_LEN};
use crate::error::{Error, StateError};
use crate::hardware::{Hardware, PayloadCallback};
use crate::lines::OperatingMode;
use crate::platform::Platform;
use crate::registers::{Address, ConfigurationRegister, CrcMode};

/// Direction a session was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    Transmitter,
    Receiver,
}

/// An nRF905 session on a [`Platform`]
///
/// # Example
/// ```no_run
/// use nrf905::{Error, Nrf905, Platform};
///
/// fn send<P: Platform>(platform: P) -> Result<(), Error> {
///     let mut radio = Nrf905::new(platform);
///     radio.set_frequency(868.2)?;
///     radio.set_address(0xDDCC_BBAA_u32)?;
///     radio.open_transmitter()?;
///     radio.write(b"hello")?;
///     radio.close()
/// }
/// ```
pub struct Nrf905<P: Platform> {
    hardware: Hardware<P>,
    config: DriverConfig,
    role: Option<Role>,
}

impl<P: Platform> Nrf905<P> {
    /// Creates a closed session with the default settings.
    pub fn new(platform: P) -> Self {
        Self {
            hardware: Hardware::new(platform, Default::default()),
            config: DriverConfig::default(),
            role: None,
        }
    }

    /// Creates a closed session with `config`.
    ///
    /// # Errors
    /// * `ValidationError::DuplicatePin` - two lines share a GPIO
    pub fn with_config(platform: P, config: DriverConfig) -> Result<Self, Error> {
        config.pins.validate()?;
        Ok(Self {
            hardware: Hardware::new(platform, config.queue_bound),
            config,
            role: None,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.role.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn platform(&self) -> &P {
        self.hardware.platform()
    }

    /// Status byte cached from the last bus transaction, `None` while closed
    pub fn status(&self) -> Option<Status> {
        self.hardware.status()
    }

    /// Bytes discarded by a bounded receive queue
    pub fn dropped_bytes(&self) -> usize {
        self.hardware.queue().dropped()
    }

    fn ensure_closed(&self, setting: &'static str) -> Result<(), Error> {
        if self.is_open() {
            warn!("{setting} NOT set. Device in use.");
            return Err(StateError::DeviceInUse { setting }.into());
        }
        Ok(())
    }

    /// Sets the GPIO lines the chip is wired to.
    pub fn set_pins(&mut self, pins: PinAssignment) -> Result<(), Error> {
        self.ensure_closed("pins")?;
        pins.validate()?;
        self.config.pins = pins;
        Ok(())
    }

    /// Selects SPI bus 0 or 1.
    ///
    /// Accepts `SpiBus`, `u8`, `i32` and `i64`, so a bare literal such as
    /// `set_spi_bus(1)` works.
    pub fn set_spi_bus<B>(&mut self, bus: B) -> Result<(), Error>
    where
        B: TryInto<SpiBus>,
        Error: From<B::Error>,
    {
        self.ensure_closed("SPI bus")?;
        self.config.spi_bus = bus.try_into()?;
        Ok(())
    }

    /// Sets the session address. Received bursts must carry it, and
    /// transmitted bursts are sent to it.
    ///
    /// Accepts `Address`, `u32`, `i32`, `i64` and integral `f64`. Literals
    /// above `i32::MAX` need a `u32` or `i64` suffix, as in
    /// `set_address(0xDDCC_BBAA_u32)`.
    pub fn set_address<A>(&mut self, address: A) -> Result<(), Error>
    where
        A: TryInto<Address>,
        Error: From<A::Error>,
    {
        self.ensure_closed("address")?;
        self.config.address = address.try_into()?;
        Ok(())
    }

    /// Selects the CRC width: 0, 8 or 16 bits.
    ///
    /// Accepts `CrcMode`, `u8`, `i32` and `i64`, so `set_crc_mode(16)` works.
    pub fn set_crc_mode<C>(&mut self, crc: C) -> Result<(), Error>
    where
        C: TryInto<CrcMode>,
        Error: From<C::Error>,
    {
        self.ensure_closed("CRC mode")?;
        self.config.crc = crc.try_into()?;
        Ok(())
    }

    /// Sets the operating frequency in MHz.
    ///
    /// The value is checked against the preset table when the session opens.
    pub fn set_frequency(&mut self, frequency_mhz: f64) -> Result<(), Error> {
        self.ensure_closed("frequency")?;
        self.config.frequency_mhz = frequency_mhz;
        Ok(())
    }

    /// Opens the session: as a receiver when a callback is given, otherwise
    /// as a transmitter.
    ///
    /// Opening again in the role already open does nothing, and a callback
    /// passed in that case is dropped.
    ///
    /// # Errors
    /// * `StateError::RoleConflict` - open in the other role
    /// * `ValidationError::UnresolvedFrequency` - no preset for the frequency.
    ///   Nothing is touched in that case.
    /// * `Error::HardwareUnavailable` - the line service or bus is unreachable
    ///
    /// Any failure after the hardware was acquired releases it again and leaves
    /// the session closed.
    pub fn open(&mut self, callback: Option<PayloadCallback>) -> Result<(), Error> {
        let requested = match callback {
            Some(_) => Role::Receiver,
            None => Role::Transmitter,
        };
        match self.role {
            Some(open) if open == requested => {
                debug!(role = ?open, "already open");
                return Ok(());
            }
            Some(open) => return Err(StateError::RoleConflict { open, requested }.into()),
            None => {}
        }

        let register = ConfigurationRegister::new(
            self.config.frequency_mhz,
            self.config.address,
            self.config.crc,
        )?;

        if let Err(err) = self.bring_up(&register, callback) {
            if let Err(release_err) = self.hardware.release() {
                warn!("release after failed open: {release_err}");
            }
            return Err(err);
        }
        self.role = Some(requested);
        info!(
            role = ?requested,
            frequency_mhz = self.config.frequency_mhz,
            address = %self.config.address,
            "device open"
        );
        Ok(())
    }

    fn bring_up(
        &mut self,
        register: &ConfigurationRegister,
        callback: Option<PayloadCallback>,
    ) -> Result<(), Error> {
        self.hardware
            .prepare(self.config.spi_bus, self.config.pins)?;
        self.hardware.configure(register)?;
        match callback {
            None => {
                self.hardware.write_transmit_address(self.config.address)?;
                self.hardware.set_mode(OperatingMode::Standby)
            }
            Some(callback) => self
                .hardware
                .begin_receive(self.config.address, Some(callback)),
        }
    }

    /// Opens the session as a transmitter.
    pub fn open_transmitter(&mut self) -> Result<(), Error> {
        self.open(None)
    }

    /// Opens the session as a receiver delivering each payload to `callback`.
    pub fn open_receiver<F>(&mut self, callback: F) -> Result<(), Error>
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.open(Some(Box::new(callback)))
    }

    /// Sends `payload` in 32 byte bursts, in order.
    ///
    /// # Errors
    /// * `StateError::NotOpen` - the session is closed
    /// * `StateError::ReceiveMode` - the session is open as a receiver
    pub fn write(&mut self, payload: &[u8]) -> Result<(), Error> {
        match self.role {
            None => Err(StateError::NotOpen.into()),
            Some(Role::Receiver) => Err(StateError::ReceiveMode.into()),
            Some(Role::Transmitter) => self.hardware.transmit(payload).map(drop),
        }
    }

    /// Takes every byte received so far. Legal in any state.
    pub fn drain_received(&self) -> Vec<u8> {
        self.hardware.drain_received()
    }

    /// Reads back the configuration register while open.
    pub fn read_configuration(&self) -> Option<[u8; CONFIG_REGISTER_LEN]> {
        self.hardware.read_configuration()
    }

    /// Releases the hardware. Always legal, and a no-op when already closed.
    pub fn close(&mut self) -> Result<(), Error> {
        if let Some(role) = self.role.take() {
            info!(?role, "closing");
        }
        self.hardware.release()
    }
}

impl<P: Platform> Drop for Nrf905<P> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("close on drop failed: {err}");
        }
    }
}
