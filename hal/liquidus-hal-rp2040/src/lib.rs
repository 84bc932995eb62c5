//! RP2040-specific HAL for the reflow oven firmware
//!
//! This crate provides RP2040 implementations of the shared
//! `liquidus-hal` traits:
//!
//! - EEPROM emulation on the last 64 KiB of QSPI flash
//!   (implements `liquidus_hal::EepromController`)
//! - GPIO outputs for the heater and fan relays
//!   (implements `liquidus_hal::OutputPin`)

#![no_std]

pub mod flash;
pub mod gpio;

pub use flash::Rp2040Eeprom;
pub use gpio::Rp2040Output;

// Re-export shared traits from liquidus-hal for convenience
pub use liquidus_hal::{EepromController, OutputPin, StorageKey};
