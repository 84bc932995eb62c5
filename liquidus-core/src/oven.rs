//! Oven context
//!
//! Ties persisted settings, the thermocouple array, the profile table, the
//! PID loop and the sequencer together. The firmware keeps exactly one,
//! behind a mutex, and drives it from three periodic tasks:
//!
//! - [`Oven::tick_second`] at 1 Hz advances the sequencer and logs a point
//! - [`Oven::pid_tick`] at 4 Hz runs the PID and updates the PWM duties
//! - [`Oven::case_temperature`] feeds the electronics fan policy
//!
//! Everything else is called by the local UI or the remote interface
//! while holding the [`InteractiveLock`](crate::InteractiveLock).

use liquidus_hal::{EepromController, FlashError};

use crate::config::{ChannelSettings, Settings};
use crate::control::{split_drive, DutyCycles, PidController, PidError, PidGains};
use crate::datalog::{DataPoint, RunLog};
use crate::profile::{ProfileError, ProfileSlotError, ProfileTable, SolderProfile, MAX_PROFILES};
use crate::pwm::PwmShared;
use crate::sensor::{ThermocoupleArray, ThermocoupleChannel, CHANNEL_COUNT};
use crate::sequencer::{Action, ReflowSequencer, SequenceError, COOLING_FAN_DUTY};
use crate::state::ControllerState;
use crate::storage::{FlashDriver, StorageError};
use crate::traits::ThermocoupleProbe;

/// Errors reported to the UI and remote layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OvenError {
    /// A run or manual mode is active
    Busy,
    /// No thermocouple channel gives a usable reading
    NoTemperature,
    /// Persistence is blocked by a latched flash fault
    StorageFault(FlashError),
    Storage(StorageError),
    Profile(ProfileError),
    /// A PID gain was negative
    InvalidGains,
    /// Thermocouple channel index past the end
    NoSuchChannel,
}

impl From<StorageError> for OvenError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Faulted(fault) => OvenError::StorageFault(fault),
            other => OvenError::Storage(other),
        }
    }
}

impl From<ProfileError> for OvenError {
    fn from(e: ProfileError) -> Self {
        OvenError::Profile(e)
    }
}

impl From<ProfileSlotError> for OvenError {
    fn from(e: ProfileSlotError) -> Self {
        match e {
            ProfileSlotError::Profile(e) => e.into(),
            ProfileSlotError::Storage(e) => e.into(),
        }
    }
}

impl From<SequenceError> for OvenError {
    fn from(e: SequenceError) -> Self {
        match e {
            SequenceError::Busy => OvenError::Busy,
            SequenceError::NoTemperature => OvenError::NoTemperature,
        }
    }
}

impl From<PidError> for OvenError {
    fn from(e: PidError) -> Self {
        match e {
            PidError::NegativeGain => OvenError::InvalidGains,
        }
    }
}

/// The reflow oven
pub struct Oven<'a, P, C> {
    driver: &'a FlashDriver<C>,
    pwm: &'a PwmShared,
    settings: Settings<'a, C>,
    sensors: ThermocoupleArray<'a, P, C>,
    profiles: ProfileTable<'a, C>,
    pid: PidController,
    sequencer: ReflowSequencer,
    log: RunLog,
    /// Seconds of end-of-run beep left
    beep_remaining: u8,
}

impl<'a, P: ThermocoupleProbe, C: EepromController> Oven<'a, P, C> {
    /// Lay out every persisted value and build the oven
    ///
    /// `driver` must already be initialised. On a freshly partitioned part
    /// call [`Oven::seed_defaults`] before anything else.
    pub fn new(
        driver: &'a FlashDriver<C>,
        pwm: &'a PwmShared,
        probes: [P; CHANNEL_COUNT],
    ) -> Result<Self, StorageError> {
        let mut layout = driver.layout();
        let settings = Settings::allocate(&mut layout)?;

        let [p0, p1, p2, p3] = probes;
        let sensors = ThermocoupleArray::new([
            ThermocoupleChannel::new(p0, ChannelSettings::allocate(&mut layout)?),
            ThermocoupleChannel::new(p1, ChannelSettings::allocate(&mut layout)?),
            ThermocoupleChannel::new(p2, ChannelSettings::allocate(&mut layout)?),
            ThermocoupleChannel::new(p3, ChannelSettings::allocate(&mut layout)?),
        ]);
        let profiles = ProfileTable::allocate(&mut layout)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("nv layout: {} of {} bytes", layout.used(), driver.window_size());

        let mut oven = Self {
            driver,
            pwm,
            settings,
            sensors,
            profiles,
            pid: PidController::default(),
            sequencer: ReflowSequencer::new(),
            log: RunLog::new(),
            beep_remaining: 0,
        };
        oven.load_pid_gains();
        Ok(oven)
    }

    /// Write factory defaults into every persisted value
    pub fn seed_defaults(&mut self) -> Result<(), OvenError> {
        self.settings.seed_defaults()?;
        for channel in self.sensors.channels_mut() {
            channel.seed_defaults()?;
        }
        self.profiles.seed_defaults()?;
        self.load_pid_gains();
        Ok(())
    }

    /// Restore factory defaults; refused while the oven is active
    pub fn factory_reset(&mut self) -> Result<(), OvenError> {
        self.ensure_idle()?;
        self.seed_defaults()
    }

    // ---- run control ----

    /// Start a run of profile `index`
    ///
    /// With no usable temperature the oven goes to `fail` and the start is
    /// refused.
    pub fn start(&mut self, index: usize) -> Result<(), OvenError> {
        self.ensure_storage()?;
        self.ensure_idle()?;
        let profile = self.profiles.get(index)?;
        profile.validate()?;

        let temperature = self.sensors.temperature();
        self.sequencer.start(profile, temperature)?;
        self.log.reset();
        #[cfg(feature = "defmt")]
        defmt::info!("starting profile {}: {}", index, profile.description.as_str());
        Ok(())
    }

    /// Start a run of the selected profile
    pub fn start_current(&mut self) -> Result<(), OvenError> {
        self.start(self.settings.current_profile())
    }

    /// Fail the active run or manual session
    ///
    /// Ignored when the oven is idle or already finished. Returns true if
    /// something was aborted. The run log ends on the `fail` point.
    pub fn abort(&mut self) -> bool {
        let aborted = self.sequencer.abort();
        if aborted {
            #[cfg(feature = "defmt")]
            defmt::warn!("aborted");
            self.finish();
            self.log
                .record(self.sequencer.time() as usize, self.current_data_point());
        }
        aborted
    }

    pub fn current_state(&self) -> ControllerState {
        self.sequencer.state()
    }

    /// Snapshot of the last sample and the current outputs
    pub fn current_data_point(&self) -> DataPoint {
        DataPoint::new(
            self.sequencer.state(),
            self.pid.setpoint(),
            self.pwm.heater_duty(),
            self.pwm.fan_duty(),
            self.sensors.last(),
        )
    }

    /// 1 Hz tick: advance the sequencer and log a data point
    pub fn tick_second(&mut self) -> ControllerState {
        self.beep_remaining = self.beep_remaining.saturating_sub(1);
        if !self.sequencer.state().heater_allowed() {
            return self.sequencer.state();
        }

        let temperature = self.sensors.sample().aggregate();
        let Some(step) = self.sequencer.tick(temperature) else {
            return self.sequencer.state();
        };

        match step.action {
            Some(Action::Begin { ambient }) => {
                self.load_pid_gains();
                self.pid.set_setpoint(ambient);
                self.pid.enable(ambient);
            }
            Some(Action::Finish) => {
                self.finish();
                self.beep_remaining = self.settings.beep_time.get();
            }
            None => self.pid.set_setpoint(step.setpoint),
        }

        self.log.record(step.time as usize, self.current_data_point());

        if step.state == ControllerState::Manual && self.manual_expired() {
            #[cfg(feature = "defmt")]
            defmt::info!("manual mode timed out");
            self.stop_manual();
        }
        self.sequencer.state()
    }

    /// PID tick: sample, run the loop, update the heater and fan duties
    ///
    /// Returns the applied duties, or `None` while the loop is disabled.
    pub fn pid_tick(&mut self) -> Option<DutyCycles> {
        if !self.pid.is_enabled() {
            return None;
        }
        let temperature = self.sensors.temperature();
        let drive = self.pid.update(temperature)?;
        let duty = split_drive(drive, self.settings.minimum_fan_speed.get());
        self.pwm.set_heater_duty(duty.heater);
        self.pwm.set_fan_duty(duty.fan, self.settings.fan_kick_cycles.get());
        Some(duty)
    }

    // ---- manual mode ----

    /// Hold the oven at a user set-point
    pub fn start_manual(&mut self) -> Result<(), OvenError> {
        self.ensure_storage()?;
        self.ensure_idle()?;
        let temperature = self.sensors.temperature();
        if temperature.is_nan() {
            return Err(OvenError::NoTemperature);
        }

        self.sequencer.enter_manual()?;
        self.log.reset();
        self.load_pid_gains();
        self.pid.set_setpoint(self.sequencer.setpoint());
        self.pid.enable(temperature);
        Ok(())
    }

    /// Nudge the manual set-point; `None` outside manual mode
    pub fn adjust_manual_setpoint(&mut self, delta: i16) -> Option<f32> {
        let setpoint = self.sequencer.adjust_setpoint(delta as f32)?;
        self.pid.set_setpoint(setpoint);
        Some(setpoint)
    }

    /// Leave manual mode with every output off
    pub fn stop_manual(&mut self) -> bool {
        let stopped = self.sequencer.exit_manual();
        if stopped {
            self.pid.disable();
            self.pid.set_setpoint(0.0);
            self.pwm.stop();
        }
        stopped
    }

    /// Drive the fan directly while no run is active
    ///
    /// Returns false (and changes nothing) while the heater is in use.
    pub fn set_idle_fan(&mut self, duty: u8) -> bool {
        if self.sequencer.state().heater_allowed() {
            return false;
        }
        self.pwm.set_heater_duty(0);
        self.pwm
            .set_fan_duty(duty.min(100), self.settings.fan_kick_cycles.get());
        true
    }

    /// True while the end-of-run beep should sound
    pub fn is_beeping(&self) -> bool {
        self.beep_remaining > 0
    }

    /// Return a finished run to `off`; also silences the beep
    pub fn acknowledge(&mut self) -> bool {
        self.beep_remaining = 0;
        let reset = self.sequencer.reset();
        if reset {
            self.pwm.stop();
        }
        reset
    }

    // ---- profiles and settings ----
    //
    // Every setter below is refused with `Busy` while the heater is in use.

    pub fn profile(&self, index: usize) -> Result<SolderProfile, OvenError> {
        Ok(self.profiles.get(index)?)
    }

    /// Overwrite an unlocked profile slot
    pub fn set_profile(&mut self, index: usize, profile: &SolderProfile) -> Result<(), OvenError> {
        self.ensure_idle()?;
        self.ensure_storage()?;
        Ok(self.profiles.set(index, profile)?)
    }

    pub fn current_profile_index(&self) -> usize {
        self.settings.current_profile()
    }

    pub fn select_profile(&mut self, index: usize) -> Result<(), OvenError> {
        self.ensure_idle()?;
        self.ensure_storage()?;
        if index >= MAX_PROFILES {
            return Err(ProfileError::IndexOutOfRange.into());
        }
        Ok(self.settings.select_profile(index)?)
    }

    // ---- PID gains ----

    /// Persist new gains and load them into the loop
    ///
    /// Refused while a run or manual mode is active. Negative gains are rejected; others are clamped to their limits.
    /// Returns the gains actually stored.
    pub fn set_pid_gains(&mut self, gains: PidGains) -> Result<PidGains, OvenError> {
        self.ensure_idle()?;
        if !(gains.kp >= 0.0) || !(gains.ki >= 0.0) || !(gains.kd >= 0.0) {
            return Err(OvenError::InvalidGains);
        }
        self.ensure_storage()?;
        let stored = self.settings.set_pid_gains(gains)?;
        self.pid.set_tunings(stored)?;
        Ok(stored)
    }

    pub fn pid_gains(&self) -> PidGains {
        self.settings.pid_gains()
    }

    // ---- thermocouple channels ----

    pub fn enable_channel(&mut self, index: usize, enabled: bool) -> Result<(), OvenError> {
        self.ensure_idle()?;
        self.ensure_storage()?;
        let channel = self
            .sensors
            .channel_mut(index)
            .ok_or(OvenError::NoSuchChannel)?;
        Ok(channel.enable(enabled)?)
    }

    pub fn is_channel_enabled(&self, index: usize) -> Result<bool, OvenError> {
        self.sensors
            .channel(index)
            .map(|c| c.is_enabled())
            .ok_or(OvenError::NoSuchChannel)
    }

    /// Set a calibration offset, clamped; returns the stored offset
    pub fn set_channel_offset(&mut self, index: usize, offset: i16) -> Result<i16, OvenError> {
        self.ensure_idle()?;
        self.ensure_storage()?;
        let channel = self
            .sensors
            .channel_mut(index)
            .ok_or(OvenError::NoSuchChannel)?;
        Ok(channel.set_offset(offset)?)
    }

    pub fn channel_offset(&self, index: usize) -> Result<i16, OvenError> {
        self.sensors
            .channel(index)
            .map(|c| c.offset())
            .ok_or(OvenError::NoSuchChannel)
    }

    /// Temperature inside the controller case
    pub fn case_temperature(&mut self) -> f32 {
        self.sensors.case_temperature()
    }

    // ---- storage ----

    /// Latched flash fault, if any
    pub fn storage_fault(&self) -> Option<FlashError> {
        self.driver.fault()
    }

    pub fn clear_storage_fault(&mut self) -> Option<FlashError> {
        self.driver.clear_fault()
    }

    // ---- accessors ----

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn sequencer(&self) -> &ReflowSequencer {
        &self.sequencer
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn settings(&self) -> &Settings<'a, C> {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings<'a, C> {
        &mut self.settings
    }

    pub fn sensors(&self) -> &ThermocoupleArray<'a, P, C> {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut ThermocoupleArray<'a, P, C> {
        &mut self.sensors
    }

    fn ensure_idle(&self) -> Result<(), OvenError> {
        if self.sequencer.state().heater_allowed() {
            Err(OvenError::Busy)
        } else {
            Ok(())
        }
    }

    fn ensure_storage(&self) -> Result<(), OvenError> {
        match self.driver.fault() {
            Some(fault) => Err(OvenError::StorageFault(fault)),
            None => Ok(()),
        }
    }

    fn manual_expired(&self) -> bool {
        self.pid.elapsed() >= self.settings.max_heater_time.get() as f32
    }

    /// Outputs for the end of a run: loop off, heater off, fan cooling
    fn finish(&mut self) {
        self.pid.disable();
        self.pid.set_setpoint(0.0);
        self.pwm.set_heater_duty(0);
        self.pwm
            .set_fan_duty(COOLING_FAN_DUTY, self.settings.fan_kick_cycles.get());
    }

    fn load_pid_gains(&mut self) {
        // Stored gains are clamped to non-negative limits
        if self.pid.set_tunings(self.settings.pid_gains()).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("stored PID gains rejected");
        }
    }
}
