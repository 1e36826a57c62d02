//! nRF905 SPI instruction set
//!
//! Every SPI transaction starts with a high to low transition on CSN followed
//! by one instruction byte. While the instruction byte is clocked in, the
//! device clocks out its status register, so each transaction yields a fresh
//! [`Status`]. Data bytes follow the instruction; multi-byte values are sent
//! least significant byte first.
//!
//! # Instruction Set (datasheet table 13)
//! - [`config`]: W_CONFIG `0000AAAA` / R_CONFIG `0001AAAA`, where `AAAA` is the
//!   register byte the transfer starts at
//! - [`payload`]: W_TX_PAYLOAD `0x20`, R_TX_PAYLOAD `0x21`, R_RX_PAYLOAD `0x24`
//! - [`address`]: W_TX_ADDRESS `0x22`, R_TX_ADDRESS `0x23`
//! - [`channel`]: CHANNEL_CONFIG `1000pphc cccccccc`, a fast path that updates
//!   channel, band and output power without a full register write
//!
//! # Important Notes
//! - Registers are only accessible in power down or standby mode
//! - The SPI interface is mode 0, MSB first, up to 10 MHz
//! - The payload registers hold one 32 byte burst

mod address;
mod channel;
mod config;
mod payload;
mod status;

pub use address::*;
pub use channel::*;
pub use config::*;
pub use payload::*;
pub use status::*;

/// Write configuration register, starting at byte 0
pub const W_CONFIG: u8 = 0b0000_0000;
/// Read configuration register, starting at byte 0
pub const R_CONFIG: u8 = 0b0001_0000;
/// Write the TX payload register
pub const W_TX_PAYLOAD: u8 = 0b0010_0000;
/// Read the TX payload register
pub const R_TX_PAYLOAD: u8 = 0b0010_0001;
/// Write the TX address register
pub const W_TX_ADDRESS: u8 = 0b0010_0010;
/// Read the TX address register
pub const R_TX_ADDRESS: u8 = 0b0010_0011;
/// Read the RX payload register
pub const R_RX_PAYLOAD: u8 = 0b0010_0100;
/// Channel configuration fast path
pub const CHANNEL_CONFIG: u8 = 0b1000_0000;

/// Configuration register byte holding the first RX address byte
pub const RX_ADDRESS_OFFSET: u8 = 5;
