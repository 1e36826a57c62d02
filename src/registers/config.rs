//! RF configuration register
//!
//! The nRF905 keeps all of its RF settings in a single 10 byte register:
//!
//! | Byte | Bits | Field        | Meaning                                  |
//! |------|------|--------------|------------------------------------------|
//! | 0    | 7:0  | CH_NO[7:0]   | channel number, low bits                 |
//! | 1    | 0    | CH_NO[8]     | channel number, high bit                 |
//! | 1    | 1    | HFREQ_PLL    | 0 = 433 MHz band, 1 = 868/915 MHz band   |
//! | 1    | 3:2  | PA_PWR       | output power                             |
//! | 1    | 4    | RX_RED_PWR   | reduced receive current                  |
//! | 1    | 5    | AUTO_RETRAN  | retransmit while TRX_CE is held high     |
//! | 2    | 2:0  | RX_AFW       | RX address width                         |
//! | 2    | 6:4  | TX_AFW       | TX address width                         |
//! | 3    | 5:0  | RX_PW        | RX payload width, 1 to 32                |
//! | 4    | 5:0  | TX_PW        | TX payload width, 1 to 32                |
//! | 5-8  |      | RX_ADDRESS   | receive address, LSB in byte 5           |
//! | 9    | 1:0  | UP_CLK_FREQ  | output clock frequency                   |
//! | 9    | 2    | UP_CLK_EN    | output clock enable                      |
//! | 9    | 5:3  | XOF          | crystal oscillator frequency             |
//! | 9    | 6    | CRC_EN       | CRC check enable                         |
//! | 9    | 7    | CRC_MODE     | 0 = 8 bit CRC, 1 = 16 bit CRC            |

use core::convert::Infallible;
use core::fmt;

use regiface::{FromByteArray, ToByteArray};
use tracing::{info, warn};

use crate::config::{BURST_LEN, CONFIG_REGISTER_LEN};
use crate::error::ValidationError;

use super::{lookup_frequency, Address, AddressWidth, ChannelSelection};

/// CRC check appended to every packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CrcMode {
    Disabled,
    Crc8,
    #[default]
    Crc16,
}

impl CrcMode {
    /// Width of the CRC in bits
    pub const fn bits(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Crc8 => 8,
            Self::Crc16 => 16,
        }
    }

    /// `CRC_MODE` and `CRC_EN` as they sit in bits 7:6 of byte 9
    const fn register_bits(self) -> u8 {
        match self {
            Self::Disabled => 0b0000_0000,
            Self::Crc8 => 0b0100_0000,
            Self::Crc16 => 0b1100_0000,
        }
    }

    const fn from_register_bits(byte: u8) -> Self {
        match (byte & 0x40 != 0, byte & 0x80 != 0) {
            (false, _) => Self::Disabled,
            (true, false) => Self::Crc8,
            (true, true) => Self::Crc16,
        }
    }
}

impl TryFrom<i64> for CrcMode {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disabled),
            8 => Ok(Self::Crc8),
            16 => Ok(Self::Crc16),
            other => Err(ValidationError::CrcWidth(other)),
        }
    }
}

impl TryFrom<u8> for CrcMode {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i32> for CrcMode {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

/// Output power (`PA_PWR`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PaPower {
    /// -10 dBm
    #[default]
    Minus10Dbm = 0b00,
    /// -2 dBm
    Minus2Dbm = 0b01,
    /// +6 dBm
    Plus6Dbm = 0b10,
    /// +10 dBm
    Plus10Dbm = 0b11,
}

impl PaPower {
    pub const fn dbm(self) -> i8 {
        match self {
            Self::Minus10Dbm => -10,
            Self::Minus2Dbm => -2,
            Self::Plus6Dbm => 6,
            Self::Plus10Dbm => 10,
        }
    }

    pub const fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => Self::Minus10Dbm,
            0b01 => Self::Minus2Dbm,
            0b10 => Self::Plus6Dbm,
            _ => Self::Plus10Dbm,
        }
    }
}

/// Crystal oscillator frequency (`XOF`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrystalFrequency {
    Mhz4 = 0b000,
    Mhz8 = 0b001,
    Mhz12 = 0b010,
    #[default]
    Mhz16 = 0b011,
    Mhz20 = 0b100,
}

impl CrystalFrequency {
    pub const fn mhz(self) -> u8 {
        match self {
            Self::Mhz4 => 4,
            Self::Mhz8 => 8,
            Self::Mhz12 => 12,
            Self::Mhz16 => 16,
            Self::Mhz20 => 20,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, ValidationError> {
        match code {
            0b000 => Ok(Self::Mhz4),
            0b001 => Ok(Self::Mhz8),
            0b010 => Ok(Self::Mhz12),
            0b011 => Ok(Self::Mhz16),
            0b100 => Ok(Self::Mhz20),
            value => Err(ValidationError::UndefinedField {
                field: "XOF",
                value,
            }),
        }
    }
}

/// Frequency of the clock offered to an attached microcontroller (`UP_CLK_FREQ`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockOutputFrequency {
    #[default]
    Mhz4 = 0b00,
    Mhz2 = 0b01,
    Mhz1 = 0b10,
    Khz500 = 0b11,
}

impl ClockOutputFrequency {
    pub const fn khz(self) -> u16 {
        match self {
            Self::Mhz4 => 4000,
            Self::Mhz2 => 2000,
            Self::Mhz1 => 1000,
            Self::Khz500 => 500,
        }
    }

    pub const fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => Self::Mhz4,
            0b01 => Self::Mhz2,
            0b10 => Self::Mhz1,
            _ => Self::Khz500,
        }
    }
}

/// RF configuration register contents
///
/// # Important Notes
/// - The register can only be written in power down or standby mode
/// - Payload widths above 32 are not defined by the chip
/// - Defaults other than channel, address and CRC match the chip's reset
///   values, apart from the 16 MHz crystal fitted to common modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationRegister {
    pub channel: ChannelSelection,
    pub pa_power: PaPower,
    pub reduced_rx_power: bool,
    pub auto_retransmit: bool,
    pub rx_address_width: AddressWidth,
    pub tx_address_width: AddressWidth,
    pub rx_payload_width: u8,
    pub tx_payload_width: u8,
    pub rx_address: Address,
    pub crc: CrcMode,
    pub crystal: CrystalFrequency,
    pub clock_output_enabled: bool,
    pub clock_output: ClockOutputFrequency,
}

impl ConfigurationRegister {
    /// Builds the default profile for the given channel, address and CRC.
    ///
    /// Lowest output power, no auto retransmit, 4 byte addresses, 32 byte
    /// payloads, 16 MHz crystal and no clock output.
    pub fn new(
        frequency_mhz: f64,
        rx_address: Address,
        crc: CrcMode,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            channel: lookup_frequency(frequency_mhz)?,
            pa_power: PaPower::default(),
            reduced_rx_power: false,
            auto_retransmit: false,
            rx_address_width: AddressWidth::Four,
            tx_address_width: AddressWidth::Four,
            rx_payload_width: BURST_LEN as u8,
            tx_payload_width: BURST_LEN as u8,
            rx_address,
            crc,
            crystal: CrystalFrequency::default(),
            clock_output_enabled: false,
            clock_output: ClockOutputFrequency::default(),
        })
    }

    /// The register image as written to the device
    pub fn encode(&self) -> [u8; CONFIG_REGISTER_LEN] {
        let [channel_low, channel_high] = self.channel.to_bytes();
        let byte_1 = channel_high
            | ((self.pa_power as u8) << 2)
            | ((self.reduced_rx_power as u8) << 4)
            | ((self.auto_retransmit as u8) << 5);
        let byte_2 = (self.tx_address_width.code() << 4) | self.rx_address_width.code();
        let byte_9 = self.crc.register_bits()
            | ((self.crystal as u8) << 3)
            | ((self.clock_output_enabled as u8) << 2)
            | self.clock_output as u8;
        let [a0, a1, a2, a3] = self.rx_address.value().to_le_bytes();

        [
            channel_low,
            byte_1,
            byte_2,
            self.rx_payload_width & 0x3F,
            self.tx_payload_width & 0x3F,
            a0,
            a1,
            a2,
            a3,
            byte_9,
        ]
    }

    /// Parses a register image read back from the device
    ///
    /// # Errors
    /// * `ValidationError::UndefinedField` - an address width or crystal code
    ///   the chip does not define
    pub fn decode(bytes: [u8; CONFIG_REGISTER_LEN]) -> Result<Self, ValidationError> {
        ConfigurationRecord::parse(bytes).register()
    }
}

impl ToByteArray for ConfigurationRegister {
    type Error = Infallible;
    type Array = [u8; CONFIG_REGISTER_LEN];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.encode())
    }
}

impl FromByteArray for ConfigurationRegister {
    type Error = ValidationError;
    type Array = [u8; CONFIG_REGISTER_LEN];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Self::decode(bytes)
    }
}

/// Field dump using the datasheet names
impl fmt::Display for ConfigurationRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ConfigurationRecord::parse(self.encode()).fmt(f)
    }
}

/// Every field of a register image as the code the chip holds
///
/// Any 10 byte image parses, including address width and crystal codes the
/// datasheet leaves undefined. Use [`register`](Self::register) for the
/// checked form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationRecord {
    pub channel: ChannelSelection,
    pub pa_power: PaPower,
    pub reduced_rx_power: bool,
    pub auto_retransmit: bool,
    /// `RX_AFW` code
    pub rx_address_width: u8,
    /// `TX_AFW` code
    pub tx_address_width: u8,
    pub rx_payload_width: u8,
    pub tx_payload_width: u8,
    pub rx_address: Address,
    pub crc: CrcMode,
    /// `XOF` code
    pub crystal: u8,
    pub clock_output_enabled: bool,
    pub clock_output: ClockOutputFrequency,
}

impl ConfigurationRecord {
    pub fn parse(bytes: [u8; CONFIG_REGISTER_LEN]) -> Self {
        Self {
            channel: ChannelSelection::from_bytes([bytes[0], bytes[1]]),
            pa_power: PaPower::from_code(bytes[1] >> 2),
            reduced_rx_power: bytes[1] & 0x10 != 0,
            auto_retransmit: bytes[1] & 0x20 != 0,
            rx_address_width: bytes[2] & 0x07,
            tx_address_width: (bytes[2] >> 4) & 0x07,
            rx_payload_width: bytes[3] & 0x3F,
            tx_payload_width: bytes[4] & 0x3F,
            rx_address: Address::from_wire(&bytes[5..9]),
            crc: CrcMode::from_register_bits(bytes[9]),
            crystal: (bytes[9] >> 3) & 0x07,
            clock_output_enabled: bytes[9] & 0x04 != 0,
            clock_output: ClockOutputFrequency::from_code(bytes[9]),
        }
    }

    /// Whether every code is one the chip defines
    pub fn is_defined(&self) -> bool {
        self.register().is_ok()
    }

    /// Converts to a [`ConfigurationRegister`].
    ///
    /// # Errors
    /// * `ValidationError::UndefinedField` - an address width or crystal code
    ///   the chip does not define
    pub fn register(&self) -> Result<ConfigurationRegister, ValidationError> {
        Ok(ConfigurationRegister {
            channel: self.channel,
            pa_power: self.pa_power,
            reduced_rx_power: self.reduced_rx_power,
            auto_retransmit: self.auto_retransmit,
            rx_address_width: AddressWidth::from_code(self.rx_address_width)?,
            tx_address_width: AddressWidth::from_code(self.tx_address_width)?,
            rx_payload_width: self.rx_payload_width,
            tx_payload_width: self.tx_payload_width,
            rx_address: self.rx_address,
            crc: self.crc,
            crystal: CrystalFrequency::from_code(self.crystal)?,
            clock_output_enabled: self.clock_output_enabled,
            clock_output: self.clock_output,
        })
    }
}

fn write_address_width(f: &mut fmt::Formatter<'_>, name: &str, code: u8) -> fmt::Result {
    match AddressWidth::from_code(code) {
        Ok(width) => writeln!(f, "{name}: {}", width.bytes()),
        Err(_) => writeln!(f, "{name}: undefined (0b{code:03b})"),
    }
}

impl fmt::Display for ConfigurationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CH_NO: {}", self.channel.channel)?;
        writeln!(f, "HFREQ_PLL: {}", self.channel.high_band as u8)?;
        writeln!(f, "  ({:.1} MHz)", self.channel.frequency_mhz())?;
        writeln!(f, "PA_PWR: {} dBm", self.pa_power.dbm())?;
        writeln!(f, "RX_RED_PWR: {}", self.reduced_rx_power as u8)?;
        writeln!(f, "AUTO_RETRAN: {}", self.auto_retransmit as u8)?;
        write_address_width(f, "TX_AFW", self.tx_address_width)?;
        write_address_width(f, "RX_AFW", self.rx_address_width)?;
        writeln!(f, "RX_PW: {}", self.rx_payload_width)?;
        writeln!(f, "TX_PW: {}", self.tx_payload_width)?;
        writeln!(f, "RX_ADDRESS: {}", self.rx_address)?;
        writeln!(f, "CRC_MODE: {}", (self.crc == CrcMode::Crc16) as u8)?;
        writeln!(f, "CRC_EN: {}", (self.crc != CrcMode::Disabled) as u8)?;
        match CrystalFrequency::from_code(self.crystal) {
            Ok(crystal) => writeln!(f, "XOF: {} MHz", crystal.mhz())?,
            Err(_) => writeln!(f, "XOF: undefined (0b{:03b})", self.crystal)?,
        }
        writeln!(f, "UP_CLK_EN: {}", self.clock_output_enabled as u8)?;
        write!(f, "UP_CLK_FREQ: {} kHz", self.clock_output.khz())
    }
}

/// Builds the 10 byte configuration record for `frequency_mhz`, `rx_address`
/// and `crc` using the default profile.
///
/// # Errors
/// * `ValidationError::UnresolvedFrequency` - no preset matches the frequency
pub fn encode_configuration(
    frequency_mhz: f64,
    rx_address: Address,
    crc: CrcMode,
) -> Result<[u8; CONFIG_REGISTER_LEN], ValidationError> {
    ConfigurationRegister::new(frequency_mhz, rx_address, crc).map(|register| register.encode())
}

/// Decodes a raw register image and logs every field for diagnostics.
///
/// Codes the chip does not define are shown as raw bits rather than
/// rejected, so a misconfigured or unpowered device can still be inspected.
///
/// # Errors
/// * `ValidationError::RegisterLength` - `bytes` is not exactly 10 bytes long
pub fn decode_and_present(bytes: &[u8]) -> Result<ConfigurationRecord, ValidationError> {
    let raw: [u8; CONFIG_REGISTER_LEN] =
        bytes
            .try_into()
            .map_err(|_| ValidationError::RegisterLength {
                expected: CONFIG_REGISTER_LEN,
                actual: bytes.len(),
            })?;
    let record = ConfigurationRecord::parse(raw);
    if !record.is_defined() {
        warn!("configuration register holds undefined codes");
    }
    info!("configuration register:\n{record}");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_433_2_with_crc16() {
        let bytes = encode_configuration(433.2, Address::new(0xDDCC_BBAA), CrcMode::Crc16).unwrap();
        assert_eq!(
            bytes,
            [
                0b0110_1100,
                0b0000_0000,
                0b0100_0100,
                32,
                32,
                0xAA,
                0xBB,
                0xCC,
                0xDD,
                0b1101_1000
            ]
        );
    }

    #[test]
    fn crc_modes_set_top_bits_of_byte_9() {
        let address = Address::new(0);
        let crc8 = encode_configuration(433.7, address, CrcMode::Crc8).unwrap();
        let off = encode_configuration(433.7, address, CrcMode::Disabled).unwrap();
        assert_eq!(crc8[9], 0b0101_1000);
        assert_eq!(off[9], 0b0001_1000);
    }

    #[test]
    fn unresolved_frequency_rejected() {
        let result = encode_configuration(512.7, Address::new(0xDDCC_BBAA), CrcMode::Crc16);
        assert_eq!(result, Err(ValidationError::UnresolvedFrequency(512.7)));
    }

    #[test]
    fn decode_reverses_encode() {
        let mut register =
            ConfigurationRegister::new(902.4, Address::new(0x1234_5678), CrcMode::Crc8).unwrap();
        register.pa_power = PaPower::Plus6Dbm;
        register.auto_retransmit = true;
        register.clock_output_enabled = true;
        register.clock_output = ClockOutputFrequency::Khz500;
        assert_eq!(ConfigurationRegister::decode(register.encode()), Ok(register));
    }

    #[test]
    fn decodes_chip_reset_value() {
        // Power-on defaults from the datasheet register table
        let reset = [0x6C, 0x00, 0x44, 0x20, 0x20, 0xE7, 0xE7, 0xE7, 0xE7, 0xE7];
        let register = ConfigurationRegister::decode(reset).unwrap();
        assert_eq!(register.channel.channel, 108);
        assert_eq!(register.rx_address, Address::new(0xE7E7_E7E7));
        assert_eq!(register.crc, CrcMode::Crc16);
        assert_eq!(register.crystal, CrystalFrequency::Mhz20);
        assert!(register.clock_output_enabled);
        assert_eq!(register.clock_output, ClockOutputFrequency::Khz500);
    }

    #[test]
    fn undefined_crystal_code_rejected() {
        let mut bytes = encode_configuration(433.2, Address::new(0), CrcMode::Crc16).unwrap();
        bytes[9] = 0b0011_1000;
        assert_eq!(
            ConfigurationRegister::decode(bytes),
            Err(ValidationError::UndefinedField {
                field: "XOF",
                value: 0b111
            })
        );
    }

    #[test]
    fn decode_and_present_requires_ten_bytes() {
        assert_eq!(
            decode_and_present(&[0; 9]),
            Err(ValidationError::RegisterLength {
                expected: 10,
                actual: 9
            })
        );
        assert!(decode_and_present(&[0; 11]).is_err());
        assert!(decode_and_present(&[]).is_err());
    }

    #[test]
    fn presentation_uses_datasheet_names() {
        let bytes = encode_configuration(433.2, Address::new(0xDDCC_BBAA), CrcMode::Crc16).unwrap();
        let text = decode_and_present(&bytes).unwrap().to_string();
        assert!(text.contains("CH_NO: 108"));
        assert!(text.contains("RX_ADDRESS: 0xDDCCBBAA"));
        assert!(text.contains("CRC_EN: 1"));
        assert!(text.contains("XOF: 16 MHz"));
    }

    #[test]
    fn presents_zeroed_image() {
        let record = decode_and_present(&[0; 10]).unwrap();
        assert!(!record.is_defined());
        assert_eq!(record.rx_address_width, 0);
        assert_eq!(record.crystal, 0b000);

        let text = record.to_string();
        assert!(text.contains("CH_NO: 0"));
        assert!(text.contains("TX_AFW: undefined (0b000)"));
        assert!(text.contains("RX_AFW: undefined (0b000)"));
        assert!(text.contains("XOF: 4 MHz"));
        assert!(text.contains("CRC_EN: 0"));
    }

    #[test]
    fn presents_chip_reset_image() {
        let reset = [0x6C, 0x00, 0x44, 0x20, 0x20, 0xE7, 0xE7, 0xE7, 0xE7, 0xE7];
        let record = decode_and_present(&reset).unwrap();
        assert!(record.is_defined());
        assert_eq!(record.register(), ConfigurationRegister::decode(reset));

        let text = record.to_string();
        assert!(text.contains("CH_NO: 108"));
        assert!(text.contains("TX_AFW: 4"));
        assert!(text.contains("RX_ADDRESS: 0xE7E7E7E7"));
        assert!(text.contains("XOF: 20 MHz"));
        assert!(text.contains("UP_CLK_FREQ: 500 kHz"));
    }

    #[test]
    fn presents_undefined_crystal_as_raw_bits() {
        let mut bytes = encode_configuration(433.2, Address::new(0), CrcMode::Crc16).unwrap();
        bytes[9] = 0b0011_1000;
        let record = decode_and_present(&bytes).unwrap();
        assert!(record.to_string().contains("XOF: undefined (0b111)"));
        assert_eq!(
            record.register(),
            Err(ValidationError::UndefinedField {
                field: "XOF",
                value: 0b111
            })
        );
    }

    #[test]
    fn crc_mode_accepts_only_0_8_16() {
        for bits in [0i64, 8, 16] {
            assert_eq!(CrcMode::try_from(bits).unwrap().bits() as i64, bits);
        }
        for bits in [-1i64, 1, 7, 9, 15, 17, 200] {
            assert_eq!(CrcMode::try_from(bits), Err(ValidationError::CrcWidth(bits)));
        }
    }
}
