//! Device addresses
//!
//! RX and TX addresses are up to 32 bits wide. Multi-byte values cross the bus
//! least significant byte first, and only the configured address width
//! (`RX_AFW` / `TX_AFW`, 1 or 4 bytes) is transferred.

use core::fmt;

use crate::error::ValidationError;

/// A 32-bit unsigned device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address(u32);

impl Address {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Wire representation: the low `width` bytes, least significant first
    pub fn to_wire(self, width: AddressWidth) -> Vec<u8> {
        self.0.to_le_bytes()[..width.bytes()].to_vec()
    }

    /// Rebuilds an address from bytes received least significant first.
    ///
    /// The bytes are reversed into most-significant-first order before being
    /// folded into the value, so a short read yields a zero-extended address.
    pub fn from_wire(bytes: &[u8]) -> Self {
        let value = bytes
            .iter()
            .rev()
            .take(4)
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
        Self(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Address> for u32 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl TryFrom<i64> for Address {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::AddressOutOfRange(value))
    }
}

impl TryFrom<i32> for Address {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<f64> for Address {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(ValidationError::AddressNotIntegral(value));
        }
        if value < 0.0 || value > f64::from(u32::MAX) {
            return Err(ValidationError::AddressOutOfRange(value as i64));
        }
        Ok(Self(value as u32))
    }
}

/// Number of address bytes compared on air (`RX_AFW` / `TX_AFW`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressWidth {
    One = 0b001,
    #[default]
    Four = 0b100,
}

impl AddressWidth {
    pub const fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Four => 4,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, ValidationError> {
        match code {
            0b001 => Ok(Self::One),
            0b100 => Ok(Self::Four),
            value => Err(ValidationError::UndefinedField {
                field: "AFW",
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wire_order_is_lsb_first() {
        let address = Address::new(0xDDCC_BBAA);
        assert_eq!(address.to_wire(AddressWidth::Four), vec![0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(address.to_wire(AddressWidth::One), vec![0xAA]);
    }

    #[test]
    fn from_wire_reverses_bytes() {
        assert_eq!(
            Address::from_wire(&[0xE7, 0xE7, 0xE7, 0xE7]),
            Address::new(0xE7E7_E7E7)
        );
        assert_eq!(Address::from_wire(&[0x01, 0x02]), Address::new(0x0201));
        assert_eq!(Address::from_wire(&[]), Address::new(0));
    }

    #[test]
    fn accepts_full_unsigned_range() {
        assert_eq!(Address::try_from(0i64), Ok(Address::new(0)));
        assert_eq!(Address::try_from(0xFFFF_FFFFi64), Ok(Address::new(u32::MAX)));
        assert_eq!(Address::try_from(4_294_967_295.0f64), Ok(Address::new(u32::MAX)));
    }

    #[test]
    fn rejects_negative_and_oversized() {
        assert_eq!(Address::try_from(-1i64), Err(ValidationError::AddressOutOfRange(-1)));
        assert_eq!(
            Address::try_from(0x1_0000_0000i64),
            Err(ValidationError::AddressOutOfRange(0x1_0000_0000))
        );
        assert_eq!(Address::try_from(-1.0f64), Err(ValidationError::AddressOutOfRange(-1)));
    }

    #[test]
    fn rejects_fractional() {
        assert_eq!(Address::try_from(3.4f64), Err(ValidationError::AddressNotIntegral(3.4)));
        assert!(Address::try_from(f64::NAN).is_err());
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Address::new(0xE7E7_E7E7).to_string(), "0xE7E7E7E7");
    }

    proptest! {
        #[test]
        fn wire_round_trip(value in any::<u32>()) {
            let address = Address::new(value);
            prop_assert_eq!(Address::from_wire(&address.to_wire(AddressWidth::Four)), address);
        }

        #[test]
        fn single_byte_width_keeps_low_byte(value in any::<u32>()) {
            let wire = Address::new(value).to_wire(AddressWidth::One);
            prop_assert_eq!(Address::from_wire(&wire).value(), value & 0xFF);
        }
    }
}
