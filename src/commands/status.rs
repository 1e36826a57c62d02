//! Status register
//!
//! The status register is clocked out on MISO during the instruction byte of
//! every transaction. Only two of its bits are documented; the rest are kept
//! as read.

use bitflags::bitflags;

bitflags! {
    /// Status register (`S[7:0]`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        /// Address matched, mirrors the AM pin
        const ADDRESS_MATCH = 1 << 7;
        /// Data ready, mirrors the DR pin
        const DATA_READY = 1 << 5;
    }
}

impl Status {
    /// Wraps a raw status byte, keeping undocumented bits
    pub const fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }
}
