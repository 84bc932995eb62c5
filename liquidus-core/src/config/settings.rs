//! Oven settings
//!
//! Limits and factory defaults for every scalar the user can change.

use core::ops::{Add, Sub};

use liquidus_hal::EepromController;

use crate::control::PidGains;
use crate::profile::MAX_PROFILES;
use crate::storage::{DurableCell, NvLayout, NvValue, StorageError};

/// Limits, edit step and default of one setting
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettingSpec<T> {
    pub min: T,
    pub max: T,
    pub step: T,
    pub default: T,
}

impl<T: PartialOrd + Copy> SettingSpec<T> {
    /// Clamp `value` into `[min, max]`
    ///
    /// Values that compare false against everything (NaN) end up at `min`.
    pub fn clamp(&self, value: T) -> T {
        if !(value >= self.min) {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

/// Minimum fan speed while heating, percent
pub const MINIMUM_FAN_SPEED: SettingSpec<u8> = SettingSpec {
    min: 5,
    max: 100,
    step: 5,
    default: 30,
};

/// Fan kick length in mains half-cycles
pub const FAN_KICK_CYCLES: SettingSpec<u8> = SettingSpec {
    min: 0,
    max: 50,
    step: 1,
    default: 10,
};

/// Thermocouple calibration offset, °C
pub const THERMOCOUPLE_OFFSET: SettingSpec<i16> = SettingSpec {
    min: -30,
    max: 30,
    step: 1,
    default: 0,
};

/// Longest manual-mode heating session, seconds
pub const MAX_HEATER_TIME: SettingSpec<u16> = SettingSpec {
    min: 10,
    max: 1000,
    step: 10,
    default: 600,
};

/// Length of the end-of-run beep, seconds
pub const BEEP_TIME: SettingSpec<u8> = SettingSpec {
    min: 0,
    max: 30,
    step: 1,
    default: 0,
};

pub const PID_KP: SettingSpec<f32> = SettingSpec {
    min: 0.5,
    max: 60.0,
    step: 0.1,
    default: 40.0,
};

pub const PID_KI: SettingSpec<f32> = SettingSpec {
    min: 0.0,
    max: 1.0,
    step: 0.001,
    default: 0.050,
};

pub const PID_KD: SettingSpec<f32> = SettingSpec {
    min: 0.0,
    max: 200.0,
    step: 0.1,
    default: 62.5,
};

/// A durable cell bound to its limits
pub struct Setting<'a, T: 'static, C> {
    cell: DurableCell<'a, T, C>,
    spec: &'static SettingSpec<T>,
}

impl<'a, T, C> Setting<'a, T, C>
where
    T: NvValue + PartialOrd + Add<Output = T> + Sub<Output = T>,
    C: EepromController,
{
    pub fn allocate(
        layout: &mut NvLayout<'a, C>,
        spec: &'static SettingSpec<T>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            cell: layout.cell()?,
            spec,
        })
    }

    /// Current value, always within limits
    pub fn get(&self) -> T {
        self.spec.clamp(self.cell.read())
    }

    /// Store `value` clamped into limits; returns what was stored
    ///
    /// Writing the value already held does not touch flash.
    pub fn set(&mut self, value: T) -> Result<T, StorageError> {
        let value = self.spec.clamp(value);
        if self.cell.read() != value {
            self.cell.write(value)?;
        }
        Ok(value)
    }

    pub fn step_up(&mut self) -> Result<T, StorageError> {
        let value = self.get() + self.spec.step;
        self.set(value)
    }

    pub fn step_down(&mut self) -> Result<T, StorageError> {
        let current = self.get();
        if current <= self.spec.min {
            return Ok(current);
        }
        self.set(current - self.spec.step)
    }

    /// Restore the factory default
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.cell.write(self.spec.default)
    }

    pub fn spec(&self) -> &'static SettingSpec<T> {
        self.spec
    }
}

/// Oven-wide persisted settings
pub struct Settings<'a, C> {
    pub minimum_fan_speed: Setting<'a, u8, C>,
    pub fan_kick_cycles: Setting<'a, u8, C>,
    pub max_heater_time: Setting<'a, u16, C>,
    pub beep_time: Setting<'a, u8, C>,
    pub pid_kp: Setting<'a, f32, C>,
    pub pid_ki: Setting<'a, f32, C>,
    pub pid_kd: Setting<'a, f32, C>,
    current_profile: DurableCell<'a, u8, C>,
}

impl<'a, C: EepromController> Settings<'a, C> {
    pub fn allocate(layout: &mut NvLayout<'a, C>) -> Result<Self, StorageError> {
        Ok(Self {
            minimum_fan_speed: Setting::allocate(layout, &MINIMUM_FAN_SPEED)?,
            fan_kick_cycles: Setting::allocate(layout, &FAN_KICK_CYCLES)?,
            max_heater_time: Setting::allocate(layout, &MAX_HEATER_TIME)?,
            beep_time: Setting::allocate(layout, &BEEP_TIME)?,
            pid_kp: Setting::allocate(layout, &PID_KP)?,
            pid_ki: Setting::allocate(layout, &PID_KI)?,
            pid_kd: Setting::allocate(layout, &PID_KD)?,
            current_profile: layout.cell()?,
        })
    }

    /// Write every factory default
    pub fn seed_defaults(&mut self) -> Result<(), StorageError> {
        self.minimum_fan_speed.reset()?;
        self.fan_kick_cycles.reset()?;
        self.max_heater_time.reset()?;
        self.beep_time.reset()?;
        self.pid_kp.reset()?;
        self.pid_ki.reset()?;
        self.pid_kd.reset()?;
        self.current_profile.write(0)
    }

    /// Selected profile slot, always a valid index
    pub fn current_profile(&self) -> usize {
        let index = self.current_profile.read() as usize;
        if index < MAX_PROFILES {
            index
        } else {
            0
        }
    }

    pub fn select_profile(&mut self, index: usize) -> Result<(), StorageError> {
        if index >= MAX_PROFILES {
            return Err(StorageError::IndexOutOfRange);
        }
        if self.current_profile() != index {
            self.current_profile.write(index as u8)?;
        }
        Ok(())
    }

    pub fn pid_gains(&self) -> PidGains {
        PidGains {
            kp: self.pid_kp.get(),
            ki: self.pid_ki.get(),
            kd: self.pid_kd.get(),
        }
    }

    /// Store gains, each clamped to its limits; returns what was stored
    pub fn set_pid_gains(&mut self, gains: PidGains) -> Result<PidGains, StorageError> {
        Ok(PidGains {
            kp: self.pid_kp.set(gains.kp)?,
            ki: self.pid_ki.set(gains.ki)?,
            kd: self.pid_kd.set(gains.kd)?,
        })
    }
}

/// Per-thermocouple persisted settings
pub struct ChannelSettings<'a, C> {
    pub offset: Setting<'a, i16, C>,
    pub enabled: DurableCell<'a, bool, C>,
}

impl<'a, C: EepromController> ChannelSettings<'a, C> {
    pub fn allocate(layout: &mut NvLayout<'a, C>) -> Result<Self, StorageError> {
        Ok(Self {
            offset: Setting::allocate(layout, &THERMOCOUPLE_OFFSET)?,
            enabled: layout.cell()?,
        })
    }

    pub fn seed_defaults(&mut self) -> Result<(), StorageError> {
        self.offset.reset()?;
        self.enabled.write(true)
    }
}
