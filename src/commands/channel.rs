//! CHANNEL_CONFIG instruction
//!
//! A two byte shortcut that rewrites `CH_NO`, `HFREQ_PLL` and `PA_PWR`
//! without touching the rest of the configuration register. The parameters
//! are folded into the instruction byte itself:
//!
//! ```text
//! 1000 pp h c   cccc cccc
//!      |  | |   |
//!      |  | |   CH_NO[7:0]
//!      |  | CH_NO[8]
//!      |  HFREQ_PLL
//!      PA_PWR
//! ```

use crate::registers::{ChannelSelection, PaPower};

use super::CHANNEL_CONFIG;

/// Parameters of a CHANNEL_CONFIG instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel: ChannelSelection,
    pub pa_power: PaPower,
}

impl ChannelConfig {
    /// Instruction byte followed by `CH_NO[7:0]`
    pub const fn to_bytes(self) -> [u8; 2] {
        let [channel_low, channel_high] = self.channel.to_bytes();
        [
            CHANNEL_CONFIG | ((self.pa_power as u8) << 2) | channel_high,
            channel_low,
        ]
    }
}
