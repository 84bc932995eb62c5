//! Hardware abstraction traits
//!
//! These traits define the interface between the oven logic and the
//! drivers that talk to real hardware.

pub mod output;
pub mod sensor;

pub use output::SwitchOutput;
pub use sensor::ThermocoupleProbe;
