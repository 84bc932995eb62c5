//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in liquidus-core for the oven's hardware:
//!
//! - Thermocouple converters (MAX31855 over SPI)
//! - Solid-state relay outputs for the heater and the convection fan

#![no_std]
#![deny(unsafe_code)]

pub mod output;
pub mod thermocouple;
