//! Board-agnostic control core for the reflow oven
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Durable flash-backed storage cells and the flash command driver
//! - Thermocouple decoding, channels and the channel array
//! - PID loop and the heater/fan drive split
//! - Zero-crossing PWM modulator
//! - Solder profiles, the controller state machine and the reflow sequencer
//! - Run log and the remote command executor

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod control;
pub mod datalog;
pub mod interactive;
pub mod oven;
pub mod profile;
pub mod pwm;
pub mod remote;
pub mod sensor;
pub mod sequencer;
pub mod state;
pub mod storage;
pub mod traits;

pub use interactive::{InteractiveGuard, InteractiveLock};
pub use oven::{Oven, OvenError};

#[cfg(test)]
mod testing;
