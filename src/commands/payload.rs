//! Payload register commands
//!
//! The TX and RX payload registers each hold one burst. With the default
//! profile both payload widths are 32 bytes, and the device always sends and
//! delivers a full burst regardless of how many bytes were meaningful.

use core::convert::Infallible;

use regiface::{Command, FromByteArray, NoParameters, ToByteArray};

use crate::config::BURST_LEN;
use crate::error::ValidationError;

use super::{R_RX_PAYLOAD, R_TX_PAYLOAD, W_TX_PAYLOAD};

/// One burst worth of payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload(pub [u8; BURST_LEN]);

impl Payload {
    /// Copies `bytes` into a burst, zero filling the remainder.
    ///
    /// # Errors
    /// * `ValidationError::PayloadTooLong` - more than 32 bytes were given
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() > BURST_LEN {
            return Err(ValidationError::PayloadTooLong {
                max: BURST_LEN,
                actual: bytes.len(),
            });
        }
        let mut burst = [0u8; BURST_LEN];
        burst[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(burst))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromByteArray for Payload {
    type Error = Infallible;
    type Array = [u8; BURST_LEN];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self(bytes))
    }
}

impl ToByteArray for Payload {
    type Error = Infallible;
    type Array = [u8; BURST_LEN];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0)
    }
}

/// W_TX_PAYLOAD command (0x20)
///
/// Loads the TX payload register.
///
/// # Important Notes
/// - Must be written in standby mode, before TRX_CE and TX_EN go high
/// - The register keeps its contents after transmission
#[derive(Debug, Clone)]
pub struct WriteTxPayload {
    pub payload: Payload,
}

impl Command for WriteTxPayload {
    type IdType = u8;
    type CommandParameters = Payload;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        W_TX_PAYLOAD
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.payload
    }
}

/// R_TX_PAYLOAD command (0x21)
///
/// Reads back the TX payload register.
#[derive(Debug, Clone)]
pub struct ReadTxPayload;

impl Command for ReadTxPayload {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = Payload;

    fn id() -> Self::IdType {
        R_TX_PAYLOAD
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// R_RX_PAYLOAD command (0x24)
///
/// Reads the received payload.
///
/// # Important Notes
/// - Valid once DR has gone high in receive mode
/// - Must be read in standby mode, DR and AM drop once the read completes
#[derive(Debug, Clone)]
pub struct ReadRxPayload;

impl Command for ReadRxPayload {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = Payload;

    fn id() -> Self::IdType {
        R_RX_PAYLOAD
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}
