//! Thermocouple sensing
//!
//! Raw converter frames are decoded and classified per channel, then
//! averaged across the array into the single temperature control runs on.

pub mod array;
pub mod thermocouple;

pub use array::{mean_of_ok, Measurement, ThermocoupleArray, CHANNEL_COUNT};
pub use thermocouple::{decode_frame, FaultCode, ThermocoupleChannel, ThermocoupleReading};
