//! Register definitions for the nRF905
//! Taken from the nRF905 Product Specification v1.5, chapter 10

mod address;
mod config;
mod frequency;

pub use address::*;
pub use config::*;
pub use frequency::*;
