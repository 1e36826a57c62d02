//! Configuration register commands
//!
//! The full 10 byte register is transferred with the W_CONFIG and R_CONFIG
//! instructions starting at byte 0. The receive address (bytes 5 to 8) has no
//! instruction of its own and is reached through the same instructions with a
//! start byte of 5 in the low nibble.

use core::convert::Infallible;

use regiface::{Command, FromByteArray, NoParameters, ToByteArray};

use crate::config::CONFIG_REGISTER_LEN;
use crate::registers::ConfigurationRegister;

use super::{R_CONFIG, W_CONFIG};

/// Raw configuration register image as read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterImage(pub [u8; CONFIG_REGISTER_LEN]);

impl FromByteArray for RegisterImage {
    type Error = Infallible;
    type Array = [u8; CONFIG_REGISTER_LEN];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes))
    }
}

impl ToByteArray for RegisterImage {
    type Error = Infallible;
    type Array = [u8; CONFIG_REGISTER_LEN];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0)
    }
}

/// W_CONFIG command (0x00)
///
/// Writes all 10 bytes of the RF configuration register.
///
/// # Important Notes
/// - Device must be in power down or standby mode
/// - New settings take effect on the next mode change
#[derive(Debug, Clone)]
pub struct WriteConfig {
    pub image: RegisterImage,
}

impl From<ConfigurationRegister> for WriteConfig {
    fn from(register: ConfigurationRegister) -> Self {
        Self {
            image: RegisterImage(register.encode()),
        }
    }
}

impl Command for WriteConfig {
    type IdType = u8;
    type CommandParameters = RegisterImage;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        W_CONFIG
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.image
    }
}

/// R_CONFIG command (0x10)
///
/// Reads all 10 bytes of the RF configuration register.
#[derive(Debug, Clone)]
pub struct ReadConfig;

impl Command for ReadConfig {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = RegisterImage;

    fn id() -> Self::IdType {
        R_CONFIG
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}
