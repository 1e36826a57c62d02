//! Address register instructions
//!
//! The TX address register has its own instructions. Its width follows
//! `TX_AFW` in the configuration register, so these transfers are variable
//! length and are framed by [`Device`](crate::Device) directly rather than
//! through a fixed-size command.

use super::{RX_ADDRESS_OFFSET, R_CONFIG, R_TX_ADDRESS, W_CONFIG, W_TX_ADDRESS};

/// Instruction pair used to reach an address register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressRegister {
    /// TX_ADDRESS, via W_TX_ADDRESS / R_TX_ADDRESS
    Transmit,
    /// RX_ADDRESS, configuration register bytes 5 to 8
    Receive,
}

impl AddressRegister {
    pub const fn write_instruction(self) -> u8 {
        match self {
            Self::Transmit => W_TX_ADDRESS,
            Self::Receive => W_CONFIG | RX_ADDRESS_OFFSET,
        }
    }

    pub const fn read_instruction(self) -> u8 {
        match self {
            Self::Transmit => R_TX_ADDRESS,
            Self::Receive => R_CONFIG | RX_ADDRESS_OFFSET,
        }
    }
}
