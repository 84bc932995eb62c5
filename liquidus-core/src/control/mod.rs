//! Temperature control
//!
//! - [`pid`] - fixed-interval PID loop
//! - [`drive`] - split of the PID command into heater and fan duties
//! - [`case_fan`] - electronics cooling fan policy

pub mod case_fan;
pub mod drive;
pub mod pid;

pub use case_fan::case_fan_duty;
pub use drive::{split_drive, DutyCycles};
pub use pid::{PidController, PidError, PidGains, OUTPUT_MAX, OUTPUT_MIN, PID_INTERVAL_S};
