//! Run telemetry
//!
//! One [`DataPoint`] per second of a run, kept in a fixed [`RunLog`] for
//! plotting and remote download.

mod log;
mod point;

pub use log::{RunLog, MAX_DATA_POINTS};
pub use point::DataPoint;
