//! Zero-crossing synchronized PWM
//!
//! Heater and fan are AC loads switched by solid-state relays. Switching
//! happens only at mains zero crossings; duty cycle is realized by picking
//! which half-cycles are on.

mod zero_crossing;

pub use zero_crossing::{DeltaSigma, OutputLevels, PwmShared, ZeroCrossingModulator};
