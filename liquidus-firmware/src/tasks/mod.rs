//! Embassy async tasks
//!
//! Each task runs independently; they meet at the oven mutex and
//! [`crate::channels::PWM_SHARED`].

pub mod case_fan;
pub mod pid;
pub mod sequencer;
pub mod zero_crossing;

pub use case_fan::case_fan_task;
pub use pid::pid_task;
pub use sequencer::sequencer_task;
pub use zero_crossing::zero_crossing_task;
