//! Events that trigger state transitions

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Run control
    /// Profile run requested
    Start,
    /// User or remote abort
    Abort,
    /// Finished run acknowledged, back to idle
    Reset,

    // Sequencer events
    /// The current phase met its time and temperature target
    PhaseComplete,
    /// The current phase ran past its timeout
    Timeout,
    /// No thermocouple produced a usable reading
    NoTemperature,

    // Manual control
    EnterManual,
    ExitManual,
}
