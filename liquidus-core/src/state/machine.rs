//! State machine definition

use super::events::Event;

/// Oven controller states
///
/// The discriminants are the 4-bit codes stored in data points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControllerState {
    /// Idle, outputs off
    Off = 0,
    /// Run failed; outputs off, fan cooling
    Fail = 1,
    /// First tick of a run
    Init = 2,
    Preheat = 3,
    Soak = 4,
    RampUp = 5,
    Dwell = 6,
    RampDown = 7,
    /// Run finished; outputs off, fan cooling
    Complete = 8,
    /// Heater held at a user set-point
    Manual = 9,
}

impl ControllerState {
    /// Lower-case name used by logs and the remote interface
    pub fn name(self) -> &'static str {
        match self {
            ControllerState::Off => "off",
            ControllerState::Fail => "fail",
            ControllerState::Init => "init",
            ControllerState::Preheat => "preheat",
            ControllerState::Soak => "soak",
            ControllerState::RampUp => "ramp_up",
            ControllerState::Dwell => "dwell",
            ControllerState::RampDown => "ramp_down",
            ControllerState::Complete => "complete",
            ControllerState::Manual => "manual",
        }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(ControllerState::Off),
            1 => Some(ControllerState::Fail),
            2 => Some(ControllerState::Init),
            3 => Some(ControllerState::Preheat),
            4 => Some(ControllerState::Soak),
            5 => Some(ControllerState::RampUp),
            6 => Some(ControllerState::Dwell),
            7 => Some(ControllerState::RampDown),
            8 => Some(ControllerState::Complete),
            9 => Some(ControllerState::Manual),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// A profile run is in progress
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ControllerState::Init
                | ControllerState::Preheat
                | ControllerState::Soak
                | ControllerState::RampUp
                | ControllerState::Dwell
                | ControllerState::RampDown
        )
    }

    /// End of a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, ControllerState::Complete | ControllerState::Fail)
    }

    /// The heater may be driven
    pub fn heater_allowed(&self) -> bool {
        self.is_running() || *self == ControllerState::Manual
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use ControllerState::*;
        use Event::*;

        match (self, event) {
            // Starting a run
            (Off | Complete | Fail, Start) => Init,

            // Run phases, in order
            (Init, PhaseComplete) => Preheat,
            (Preheat, PhaseComplete) => Soak,
            (Soak, PhaseComplete) => RampUp,
            (RampUp, PhaseComplete) => Dwell,
            (Dwell, PhaseComplete) => RampDown,
            (RampDown, PhaseComplete) => Complete,

            // Phase failures
            (Preheat | Soak | RampUp, Timeout) => Fail,
            (s, NoTemperature) if s.is_running() => Fail,

            // Aborts
            (s, Abort) if s.is_running() => Fail,
            (Manual, Abort) => Fail,

            // Manual mode
            (Off | Complete | Fail, EnterManual) => Manual,
            (Manual, ExitManual) => Off,
            (Manual, NoTemperature) => Fail,

            // Finished runs
            (Complete | Fail, Reset) => Off,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run_sequence() {
        let mut state = ControllerState::Off.transition(Event::Start);
        assert_eq!(state, ControllerState::Init);

        let expected = [
            ControllerState::Preheat,
            ControllerState::Soak,
            ControllerState::RampUp,
            ControllerState::Dwell,
            ControllerState::RampDown,
            ControllerState::Complete,
        ];
        for next in expected {
            state = state.transition(Event::PhaseComplete);
            assert_eq!(state, next);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_abort_from_running_states() {
        let states = [
            ControllerState::Init,
            ControllerState::Preheat,
            ControllerState::Soak,
            ControllerState::RampUp,
            ControllerState::Dwell,
            ControllerState::RampDown,
            ControllerState::Manual,
        ];

        for state in states {
            assert_eq!(state.transition(Event::Abort), ControllerState::Fail);
        }
    }

    #[test]
    fn test_abort_ignored_when_idle() {
        assert_eq!(
            ControllerState::Off.transition(Event::Abort),
            ControllerState::Off
        );
        assert_eq!(
            ControllerState::Complete.transition(Event::Abort),
            ControllerState::Complete
        );
    }

    #[test]
    fn test_timeouts_only_in_timed_phases() {
        assert_eq!(
            ControllerState::Soak.transition(Event::Timeout),
            ControllerState::Fail
        );
        assert_eq!(
            ControllerState::Dwell.transition(Event::Timeout),
            ControllerState::Dwell
        );
        assert_eq!(
            ControllerState::RampDown.transition(Event::Timeout),
            ControllerState::RampDown
        );
    }

    #[test]
    fn test_no_temperature_fails_run() {
        assert_eq!(
            ControllerState::Dwell.transition(Event::NoTemperature),
            ControllerState::Fail
        );
        assert_eq!(
            ControllerState::Off.transition(Event::NoTemperature),
            ControllerState::Off
        );
    }

    #[test]
    fn test_manual_mode() {
        let manual = ControllerState::Off.transition(Event::EnterManual);
        assert_eq!(manual, ControllerState::Manual);
        assert!(manual.heater_allowed());
        assert_eq!(manual.transition(Event::Start), ControllerState::Manual);
        assert_eq!(manual.transition(Event::ExitManual), ControllerState::Off);
    }

    #[test]
    fn test_bits_round_trip() {
        for bits in 0..10 {
            let state = ControllerState::from_bits(bits).unwrap();
            assert_eq!(state.bits(), bits);
        }
        assert_eq!(ControllerState::from_bits(10), None);
        assert_eq!(ControllerState::RampUp.name(), "ramp_up");
    }
}
