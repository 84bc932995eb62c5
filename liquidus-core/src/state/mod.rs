//! Controller state machine
//!
//! The oven is always in exactly one [`ControllerState`]. Phase changes
//! during a run are driven by the sequencer; starts, aborts and manual
//! mode come from the user or the remote interface.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::ControllerState;
