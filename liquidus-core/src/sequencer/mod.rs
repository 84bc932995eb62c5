//! Reflow profile sequencer
//!
//! Ticked once a second with the aggregate oven temperature. Works out the
//! PID set-point for the current phase and decides when a phase is done:
//!
//! ```text
//!                 peak ____
//!                     /    \
//!        soak2 ......      \
//!   soak1 ....              \
//!        /                   \
//!  ambient                    ambient + 20
//!   preheat  soak  ramp_up dwell ramp_down
//! ```
//!
//! Preheat and soak end when their time is up and the oven is within
//! [`TOLERANCE_C`] of the phase's final temperature. The sequencer only
//! computes; the oven context applies set-points and outputs.

use crate::profile::SolderProfile;
use crate::state::{ControllerState, Event};

/// How close the oven has to get to a phase target, °C
pub const TOLERANCE_C: f32 = 2.0;

/// Ramp-down ends this far above ambient, °C
pub const COMPLETE_MARGIN_C: f32 = 20.0;

/// Fan duty while the oven cools after a run
pub const COOLING_FAN_DUTY: u8 = 100;

/// Manual mode set-point on entry, °C
pub const MANUAL_SETPOINT_C: f32 = 100.0;

/// Highest manual set-point, °C
pub const MANUAL_SETPOINT_MAX_C: f32 = 255.0;

/// Side effect the oven has to carry out after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Run started; enable the PID from `ambient`
    Begin { ambient: f32 },
    /// Run ended in `complete` or `fail`; stop heating
    Finish,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// State after the tick
    pub state: ControllerState,
    /// Run second the tick belongs to
    pub time: u32,
    pub setpoint: f32,
    pub action: Option<Action>,
}

/// Why a run could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceError {
    /// A run or manual mode is active
    Busy,
    /// No usable temperature at start; the run went straight to `fail`
    NoTemperature,
}

/// Profile sequencer
///
/// Owns the single live [`ControllerState`].
#[derive(Debug, Clone)]
pub struct ReflowSequencer {
    state: ControllerState,
    profile: Option<SolderProfile>,
    time: u32,
    setpoint: f32,
    ambient: f32,
    timeout: u32,
    soak_start: u32,
    dwell_start: u32,
}

impl ReflowSequencer {
    pub const fn new() -> Self {
        Self {
            state: ControllerState::Off,
            profile: None,
            time: 0,
            setpoint: 0.0,
            ambient: 0.0,
            timeout: 0,
            soak_start: 0,
            dwell_start: 0,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Seconds since the run (or manual mode) started
    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    /// Temperature at the start of the run
    pub fn ambient(&self) -> f32 {
        self.ambient
    }

    /// Second after which the current phase fails, 0 when unarmed
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Profile of the current or last run
    pub fn profile(&self) -> Option<&SolderProfile> {
        self.profile.as_ref()
    }

    /// Arm a run of `profile`; the next tick initialises it
    ///
    /// `temperature` is the current aggregate. A NaN fails the run on the
    /// spot.
    pub fn start(&mut self, profile: SolderProfile, temperature: f32) -> Result<(), SequenceError> {
        if !self.apply(Event::Start) {
            return Err(SequenceError::Busy);
        }
        self.profile = Some(profile);
        self.time = 0;
        self.setpoint = 0.0;
        self.timeout = 0;
        if temperature.is_nan() {
            self.apply(Event::NoTemperature);
            return Err(SequenceError::NoTemperature);
        }
        Ok(())
    }

    /// Fail the run or leave manual mode through `fail`
    ///
    /// Returns true if the state changed.
    pub fn abort(&mut self) -> bool {
        self.apply(Event::Abort)
    }

    /// Back to `off` after a finished run
    pub fn reset(&mut self) -> bool {
        self.apply(Event::Reset)
    }

    /// Enter manual mode holding [`MANUAL_SETPOINT_C`]
    pub fn enter_manual(&mut self) -> Result<(), SequenceError> {
        if !self.apply(Event::EnterManual) {
            return Err(SequenceError::Busy);
        }
        self.time = 0;
        self.setpoint = MANUAL_SETPOINT_C;
        Ok(())
    }

    pub fn exit_manual(&mut self) -> bool {
        let exited = self.apply(Event::ExitManual);
        if exited {
            self.setpoint = 0.0;
        }
        exited
    }

    /// Move the manual set-point by `delta`, clamped to 0..=255 °C
    ///
    /// Returns the new set-point, or `None` outside manual mode.
    pub fn adjust_setpoint(&mut self, delta: f32) -> Option<f32> {
        if self.state != ControllerState::Manual {
            return None;
        }
        let setpoint = self.setpoint + delta;
        if !setpoint.is_nan() {
            self.setpoint = setpoint.clamp(0.0, MANUAL_SETPOINT_MAX_C);
        }
        Some(self.setpoint)
    }

    /// Advance one second
    ///
    /// `temperature` is the aggregate oven temperature, NaN when no
    /// channel is usable. Returns `None` when neither a run nor manual
    /// mode is active.
    pub fn tick(&mut self, temperature: f32) -> Option<Step> {
        if self.state == ControllerState::Manual {
            return Some(self.tick_manual(temperature));
        }
        if !self.state.is_running() {
            return None;
        }
        let profile = self.profile?;

        let mut action = None;
        if temperature.is_nan() {
            self.apply(Event::NoTemperature);
        } else {
            if self.state == ControllerState::Init {
                self.init(temperature, &profile);
                action = Some(Action::Begin {
                    ambient: temperature,
                });
            }
            match self.state {
                ControllerState::Preheat => self.preheat(temperature, &profile),
                ControllerState::Soak => self.soak(temperature, &profile),
                ControllerState::RampUp => self.ramp_up(temperature, &profile),
                ControllerState::Dwell => self.dwell(&profile),
                ControllerState::RampDown => self.ramp_down(temperature, &profile),
                _ => {}
            }
        }

        if self.state.is_terminal() {
            self.setpoint = 0.0;
            action = Some(Action::Finish);
            #[cfg(feature = "defmt")]
            defmt::info!("run ended in {} at {}s", self.state.name(), self.time);
        }

        Some(self.advance(action))
    }

    fn tick_manual(&mut self, temperature: f32) -> Step {
        let mut action = None;
        if temperature.is_nan() {
            self.apply(Event::NoTemperature);
            self.setpoint = 0.0;
            action = Some(Action::Finish);
        }
        self.advance(action)
    }

    fn advance(&mut self, action: Option<Action>) -> Step {
        let step = Step {
            state: self.state,
            time: self.time,
            setpoint: self.setpoint,
            action,
        };
        self.time = self.time.saturating_add(1);
        step
    }

    fn apply(&mut self, event: Event) -> bool {
        let next = self.state.transition(event);
        let changed = next != self.state;
        if changed {
            #[cfg(feature = "defmt")]
            defmt::debug!("{} -> {}", self.state.name(), next.name());
            self.state = next;
        }
        changed
    }

    fn init(&mut self, temperature: f32, profile: &SolderProfile) {
        self.time = 0;
        self.ambient = temperature;
        self.setpoint = temperature;
        self.timeout = round_secs(1.1 * profile.preheat_time as f32);
        self.apply(Event::PhaseComplete);
        #[cfg(feature = "defmt")]
        defmt::info!("run started, ambient {}", temperature);
    }

    fn preheat(&mut self, temperature: f32, profile: &SolderProfile) {
        let preheat_time = profile.preheat_time as u32;
        let soak_temp1 = profile.soak_temp1 as f32;
        if self.time < preheat_time {
            let fraction = self.time as f32 / preheat_time as f32;
            self.setpoint = self.ambient + fraction * (soak_temp1 - self.ambient);
        } else if temperature >= soak_temp1 - TOLERANCE_C {
            self.apply(Event::PhaseComplete);
            self.soak_start = self.time;
            self.timeout = self.time + round_secs(1.2 * profile.soak_time as f32);
        } else if self.time > self.timeout {
            self.apply(Event::Timeout);
        }
    }

    fn soak(&mut self, temperature: f32, profile: &SolderProfile) {
        let soak_time = profile.soak_time as u32;
        let soak_temp1 = profile.soak_temp1 as f32;
        let soak_temp2 = profile.soak_temp2 as f32;
        let elapsed = self.time - self.soak_start;
        if elapsed < soak_time {
            let fraction = elapsed as f32 / soak_time as f32;
            self.setpoint = soak_temp1 + fraction * (soak_temp2 - soak_temp1);
        } else if temperature >= soak_temp2 - TOLERANCE_C {
            self.apply(Event::PhaseComplete);
            // Twice the nominal ramp time
            let remaining = profile.peak_temp as f32 - self.setpoint;
            self.timeout = self.time + round_secs(2.0 * remaining / profile.ramp_up_slope);
        } else if self.time > self.timeout {
            self.apply(Event::Timeout);
        }
    }

    fn ramp_up(&mut self, temperature: f32, profile: &SolderProfile) {
        let peak = profile.peak_temp as f32;
        if self.setpoint < peak {
            self.setpoint = (self.setpoint + profile.ramp_up_slope).min(peak);
        } else if temperature >= peak - TOLERANCE_C {
            self.apply(Event::PhaseComplete);
            self.dwell_start = self.time;
            self.timeout = 0;
        } else if self.time > self.timeout {
            self.apply(Event::Timeout);
        }
    }

    fn dwell(&mut self, profile: &SolderProfile) {
        if self.time >= self.dwell_start + profile.peak_dwell as u32 {
            self.apply(Event::PhaseComplete);
        }
    }

    fn ramp_down(&mut self, temperature: f32, profile: &SolderProfile) {
        if self.setpoint > self.ambient {
            self.setpoint = (self.setpoint + profile.ramp_down_slope).max(self.ambient);
        }
        if temperature <= self.ambient + COMPLETE_MARGIN_C {
            self.apply(Event::PhaseComplete);
        }
    }
}

impl Default for ReflowSequencer {
    fn default() -> Self {
        Self::new()
    }
}

fn round_secs(seconds: f32) -> u32 {
    // `as` saturates negatives to 0
    libm::roundf(seconds) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Description;
    use proptest::prelude::*;

    const AMBIENT: f32 = 25.0;

    fn scenario_profile() -> SolderProfile {
        SolderProfile {
            description: Description::new("scenario"),
            unlocked: true,
            liquidus: 183,
            preheat_time: 90,
            soak_temp1: 140,
            soak_temp2: 183,
            soak_time: 120,
            ramp_up_slope: 3.0,
            peak_temp: 210,
            peak_dwell: 20,
            ramp_down_slope: -3.0,
        }
    }

    /// Run with an oven that reaches each set-point one tick later
    fn run_tracking(sequencer: &mut ReflowSequencer) -> (Step, u32) {
        let mut temperature = AMBIENT;
        let mut ticks = 0;
        loop {
            let step = sequencer.tick(temperature).unwrap();
            ticks += 1;
            if step.state.is_terminal() || ticks > 1000 {
                return (step, ticks);
            }
            temperature = step.setpoint;
        }
    }

    #[test]
    fn test_scenario_completes() {
        let profile = scenario_profile();
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(profile, AMBIENT).unwrap();

        let (last, ticks) = run_tracking(&mut sequencer);
        assert_eq!(last.state, ControllerState::Complete);
        assert_eq!(last.action, Some(Action::Finish));
        assert_eq!(last.setpoint, 0.0);

        let nominal = profile.nominal_duration(AMBIENT);
        assert_eq!(nominal, 301);
        // The oven trails the set-point by one tick. Preheat ends at second 90
        // (138.7 >= 138), soak at 210 (182.6 >= 181), the peak is reached at
        // 220 so dwell runs 221..241, and ramp-down drops 3 per second from
        // 210 until 45 at second 297. Seconds count from 0.
        assert_eq!(ticks, 298);
    }

    #[test]
    fn test_phase_order() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(scenario_profile(), AMBIENT).unwrap();

        let mut seen = heapless::Vec::<ControllerState, 8>::new();
        let mut temperature = AMBIENT;
        for _ in 0..400 {
            let Some(step) = sequencer.tick(temperature) else {
                break;
            };
            if seen.last() != Some(&step.state) {
                seen.push(step.state).unwrap();
            }
            temperature = step.setpoint;
        }
        assert_eq!(
            seen.as_slice(),
            &[
                ControllerState::Preheat,
                ControllerState::Soak,
                ControllerState::RampUp,
                ControllerState::Dwell,
                ControllerState::RampDown,
                ControllerState::Complete,
            ]
        );
    }

    #[test]
    fn test_init_tick() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(scenario_profile(), AMBIENT).unwrap();
        assert_eq!(sequencer.state(), ControllerState::Init);

        let step = sequencer.tick(AMBIENT).unwrap();
        assert_eq!(step.state, ControllerState::Preheat);
        assert_eq!(step.time, 0);
        assert_eq!(step.setpoint, AMBIENT);
        assert_eq!(step.action, Some(Action::Begin { ambient: AMBIENT }));
        assert_eq!(sequencer.timeout(), 99);
        assert_eq!(sequencer.ambient(), AMBIENT);
    }

    #[test]
    fn test_preheat_ramp_is_linear() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(scenario_profile(), AMBIENT).unwrap();
        sequencer.tick(AMBIENT);
        for _ in 1..45 {
            sequencer.tick(AMBIENT);
        }
        let step = sequencer.tick(AMBIENT).unwrap();
        assert_eq!(step.time, 45);
        assert!((step.setpoint - 82.5).abs() < 1e-3);
    }

    #[test]
    fn test_preheat_timeout() {
        let profile = scenario_profile();
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(profile, AMBIENT).unwrap();

        // Oven never gets warm
        let mut last = None;
        for _ in 0..200 {
            match sequencer.tick(AMBIENT) {
                Some(step) => {
                    last = Some(step);
                    if step.state.is_terminal() {
                        break;
                    }
                }
                None => break,
            }
        }
        let last = last.unwrap();
        let timeout = libm::roundf(1.1 * profile.preheat_time as f32) as u32;
        assert_eq!(last.state, ControllerState::Fail);
        assert_eq!(last.time, timeout + 1);
        assert_eq!(sequencer.tick(AMBIENT), None);
    }

    #[test]
    fn test_late_soak_start_within_timeout() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(scenario_profile(), AMBIENT).unwrap();
        for _ in 0..95 {
            sequencer.tick(AMBIENT);
        }
        assert_eq!(sequencer.state(), ControllerState::Preheat);

        let step = sequencer.tick(139.0).unwrap();
        assert_eq!(step.state, ControllerState::Soak);
        assert_eq!(sequencer.timeout(), 95 + 144);
    }

    #[test]
    fn test_abort() {
        let mut sequencer = ReflowSequencer::new();
        assert!(!sequencer.abort());

        sequencer.start(scenario_profile(), AMBIENT).unwrap();
        sequencer.tick(AMBIENT);
        assert!(sequencer.abort());
        assert_eq!(sequencer.state(), ControllerState::Fail);
        assert_eq!(sequencer.tick(AMBIENT), None);

        // Already terminal
        assert!(!sequencer.abort());
    }

    #[test]
    fn test_start_while_running_is_busy() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(scenario_profile(), AMBIENT).unwrap();
        assert_eq!(
            sequencer.start(scenario_profile(), AMBIENT),
            Err(SequenceError::Busy)
        );
    }

    #[test]
    fn test_restart_after_complete() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.start(scenario_profile(), AMBIENT).unwrap();
        run_tracking(&mut sequencer);
        assert!(sequencer.start(scenario_profile(), AMBIENT).is_ok());
        assert_eq!(sequencer.time(), 0);
    }

    #[test]
    fn test_start_without_temperature() {
        let mut sequencer = ReflowSequencer::new();
        assert_eq!(
            sequencer.start(scenario_profile(), f32::NAN),
            Err(SequenceError::NoTemperature)
        );
        assert_eq!(sequencer.state(), ControllerState::Fail);
        assert_eq!(sequencer.tick(AMBIENT), None);
    }

    #[test]
    fn test_manual_mode() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.enter_manual().unwrap();
        assert_eq!(sequencer.setpoint(), MANUAL_SETPOINT_C);

        assert_eq!(sequencer.adjust_setpoint(5.0), Some(105.0));
        assert_eq!(sequencer.adjust_setpoint(500.0), Some(255.0));
        assert_eq!(sequencer.adjust_setpoint(-1000.0), Some(0.0));

        let step = sequencer.tick(50.0).unwrap();
        assert_eq!(step.state, ControllerState::Manual);
        assert_eq!(step.time, 0);

        assert!(sequencer.exit_manual());
        assert_eq!(sequencer.state(), ControllerState::Off);
        assert_eq!(sequencer.adjust_setpoint(5.0), None);
    }

    #[test]
    fn test_manual_fails_without_temperature() {
        let mut sequencer = ReflowSequencer::new();
        sequencer.enter_manual().unwrap();
        let step = sequencer.tick(f32::NAN).unwrap();
        assert_eq!(step.state, ControllerState::Fail);
        assert_eq!(step.action, Some(Action::Finish));
    }

    proptest! {
        #[test]
        fn prop_nan_fails_on_next_tick(healthy_ticks in 0usize..400) {
            let mut sequencer = ReflowSequencer::new();
            sequencer.start(scenario_profile(), AMBIENT).unwrap();

            let mut temperature = AMBIENT;
            for _ in 0..healthy_ticks {
                match sequencer.tick(temperature) {
                    Some(step) if !step.state.is_terminal() => temperature = step.setpoint,
                    _ => return Ok(()),
                }
            }

            let step = sequencer.tick(f32::NAN).unwrap();
            prop_assert_eq!(step.state, ControllerState::Fail);
            prop_assert_eq!(step.action, Some(Action::Finish));
            prop_assert_eq!(step.setpoint, 0.0);
        }
    }
}
