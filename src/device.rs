//! nRF905 Register Interface
//!
//! This module provides register-level access to the nRF905 over SPI. It is
//! built around the `Device<SPI>` struct which wraps an `embedded-hal`
//! [`SpiDevice`] and provides methods for:
//! - Executing fixed-size instructions from [`commands`](crate::commands)
//! - Reading and writing the configuration, address and payload registers
//! - Tracking the status byte clocked out at the start of every transaction
//!
//! Reads that fail on the bus are reported as empty results rather than
//! errors, leaving it to the caller to treat them as "no data yet".
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use nrf905::{Address, CrcMode, ConfigurationRegister, Device, Error};
//!
//! fn configure<SPI: SpiDevice>(spi: SPI) -> Result<Device<SPI>, Error> {
//!     let mut device = Device::new(spi);
//!     let register = ConfigurationRegister::new(433.2, Address::new(0xE7E7E7E7), CrcMode::Crc16)?;
//!     device.write_configuration_register(&register)?;
//!     Ok(device)
//! }
//! ```

use core::convert::Infallible;

use embedded_hal::spi::{Operation, SpiDevice};
use regiface::{errors::Error as RegifaceError, ByteArray, Command, FromByteArray, ToByteArray};
use tracing::{trace, warn};

use crate::commands::{
    AddressRegister, ChannelConfig, Payload, ReadConfig, ReadRxPayload, ReadTxPayload,
    RegisterImage, Status, WriteConfig, WriteTxPayload,
};
use crate::config::CONFIG_REGISTER_LEN;
use crate::error::{Error, ValidationError};
use crate::registers::{Address, AddressWidth, ConfigurationRegister};

/// Register interface for the nRF905.
///
/// Wraps an SPI device and remembers the last status byte the chip returned,
/// along with the address widths the chip was last configured with.
pub struct Device<SPI> {
    spi: SPI,
    status: Status,
    rx_address_width: AddressWidth,
    tx_address_width: AddressWidth,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI interface.
    ///
    /// Address widths start at the chip default of 4 bytes.
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            status: Status::default(),
            rx_address_width: AddressWidth::default(),
            tx_address_width: AddressWidth::default(),
        }
    }

    /// Releases the underlying SPI device.
    ///
    /// This method consumes the Device instance and returns the wrapped SPI interface.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Last status byte observed on the bus
    pub fn status(&self) -> Status {
        self.status
    }

    /// Overrides the address widths used by the address register transfers.
    ///
    /// Normally kept in step by
    /// [`write_configuration_register`](Device::write_configuration_register).
    pub fn set_address_widths(&mut self, rx: AddressWidth, tx: AddressWidth) {
        self.rx_address_width = rx;
        self.tx_address_width = tx;
    }
}

impl<SPI> Device<SPI>
where
    SPI: SpiDevice,
{
    /// Runs one framed transaction: the instruction byte (capturing the status
    /// byte clocked out alongside it), then `write`, then `read`.
    fn transfer(&mut self, instruction: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error> {
        let mut status = [0u8];
        {
            let instruction = [instruction];
            let mut operations = vec![Operation::Transfer(&mut status[..], &instruction[..])];
            if !write.is_empty() {
                operations.push(Operation::Write(write));
            }
            if !read.is_empty() {
                operations.push(Operation::Read(&mut *read));
            }
            self.spi.transaction(&mut operations).map_err(Error::bus)?;
        }
        self.status = Status::from_byte(status[0]);
        trace!(
            instruction = format_args!("{instruction:#04x}"),
            status = format_args!("{:#04x}", status[0]),
            written = write.len(),
            read = read.len(),
            "spi transaction"
        );
        Ok(())
    }

    /// Executes a fixed-size instruction on the device.
    ///
    /// # Type Parameters
    /// * `C` - Command type implementing the Command trait with u8 ID
    ///
    /// # Errors
    /// * `Error::Bus` - SPI communication failed
    /// * `Error::Register` - Failed to parse command response
    pub fn execute_command<C>(&mut self, command: C) -> Result<C::ResponseParameters, Error>
    where
        C: Command<IdType = u8>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let request = command.invoking_parameters().to_bytes()?;
        let mut raw_response = <C::ResponseParameters as FromByteArray>::Array::new();

        self.transfer(C::id(), request.as_ref(), raw_response.as_mut())?;

        C::ResponseParameters::from_bytes(raw_response)
            .map_err(|_| Error::Register(RegifaceError::DeserializationError))
    }

    /// Writes a raw 10 byte image to the configuration register.
    ///
    /// # Errors
    /// * `ValidationError::RegisterLength` - `bytes` is not 10 bytes long.
    ///   Nothing is sent in that case.
    /// * `Error::Bus` - SPI communication failed
    pub fn write_configuration(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let image: [u8; CONFIG_REGISTER_LEN] =
            bytes
                .try_into()
                .map_err(|_| ValidationError::RegisterLength {
                    expected: CONFIG_REGISTER_LEN,
                    actual: bytes.len(),
                })?;
        self.execute_command(WriteConfig {
            image: RegisterImage(image),
        })?;
        Ok(())
    }

    /// Writes a configuration register and adopts its address widths.
    pub fn write_configuration_register(
        &mut self,
        register: &ConfigurationRegister,
    ) -> Result<(), Error> {
        self.execute_command(WriteConfig::from(*register))?;
        self.set_address_widths(register.rx_address_width, register.tx_address_width);
        Ok(())
    }

    /// Reads the 10 byte configuration register.
    ///
    /// Returns `None` if the transfer failed.
    pub fn read_configuration(&mut self) -> Option<[u8; CONFIG_REGISTER_LEN]> {
        match self.execute_command(ReadConfig) {
            Ok(RegisterImage(image)) => Some(image),
            Err(err) => {
                warn!("configuration register read failed: {err}");
                None
            }
        }
    }

    /// Writes `address` to the TX address register, LSB first.
    pub fn write_transmit_address(&mut self, address: Address) -> Result<(), Error> {
        self.write_address(AddressRegister::Transmit, address)
    }

    /// Reads the TX address register.
    pub fn read_transmit_address(&mut self) -> Result<Address, Error> {
        self.read_address(AddressRegister::Transmit)
    }

    /// Writes `address` to the RX address bytes of the configuration register.
    pub fn write_receive_address(&mut self, address: Address) -> Result<(), Error> {
        self.write_address(AddressRegister::Receive, address)
    }

    /// Reads the RX address bytes of the configuration register.
    pub fn read_receive_address(&mut self) -> Result<Address, Error> {
        self.read_address(AddressRegister::Receive)
    }

    fn address_width(&self, register: AddressRegister) -> AddressWidth {
        match register {
            AddressRegister::Transmit => self.tx_address_width,
            AddressRegister::Receive => self.rx_address_width,
        }
    }

    fn write_address(&mut self, register: AddressRegister, address: Address) -> Result<(), Error> {
        let bytes = address.to_wire(self.address_width(register));
        self.transfer(register.write_instruction(), &bytes, &mut [])
    }

    fn read_address(&mut self, register: AddressRegister) -> Result<Address, Error> {
        let mut bytes = [0u8; 4];
        let width = self.address_width(register).bytes();
        self.transfer(register.read_instruction(), &[], &mut bytes[..width])?;
        Ok(Address::from_wire(&bytes[..width]))
    }

    /// Loads one burst into the TX payload register, zero filling it to 32 bytes.
    ///
    /// # Errors
    /// * `ValidationError::PayloadTooLong` - more than 32 bytes given
    /// * `Error::Bus` - SPI communication failed
    pub fn write_transmit_payload(&mut self, burst: &[u8]) -> Result<(), Error> {
        let payload = Payload::from_slice(burst)?;
        self.execute_command(WriteTxPayload { payload })?;
        Ok(())
    }

    /// Reads back the TX payload register.
    pub fn read_transmit_payload(&mut self) -> Result<Payload, Error> {
        self.execute_command(ReadTxPayload)
    }

    /// Reads the RX payload register.
    ///
    /// Returns an empty vector if the transfer failed.
    pub fn read_receive_payload(&mut self) -> Vec<u8> {
        match self.execute_command(ReadRxPayload) {
            Ok(payload) => payload.as_bytes().to_vec(),
            Err(err) => {
                warn!("receive payload read failed: {err}");
                Vec::new()
            }
        }
    }

    /// Updates channel, band and output power with the CHANNEL_CONFIG shortcut.
    pub fn set_channel_config(&mut self, config: ChannelConfig) -> Result<(), Error> {
        let [instruction, channel_low] = config.to_bytes();
        self.transfer(instruction, &[channel_low], &mut [])
    }
}
