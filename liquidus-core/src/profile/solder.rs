//! Solder profile definition

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bytes reserved for a profile description
pub const DESCRIPTION_LEN: usize = 20;

/// Profile description, NUL padded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Description([u8; DESCRIPTION_LEN]);

impl Description {
    pub const EMPTY: Self = Self([0; DESCRIPTION_LEN]);

    /// Build from text, truncated to [`DESCRIPTION_LEN`] bytes on a char boundary
    pub const fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut len = if bytes.len() < DESCRIPTION_LEN {
            bytes.len()
        } else {
            DESCRIPTION_LEN
        };
        // Back off to a char boundary
        while len > 0 && len < bytes.len() && (bytes[len] & 0xC0) == 0x80 {
            len -= 1;
        }
        let mut out = [0u8; DESCRIPTION_LEN];
        let mut i = 0;
        while i < len {
            out[i] = bytes[i];
            i += 1;
        }
        Self(out)
    }

    pub fn from_bytes(bytes: [u8; DESCRIPTION_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DESCRIPTION_LEN] {
        &self.0
    }

    /// Text up to the first NUL; invalid UTF-8 (erased flash) reads as empty
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(DESCRIPTION_LEN);
        core::str::from_utf8(&self.0[..len]).unwrap_or("")
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Description {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// Problems that make a profile unusable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileError {
    /// Soak end is below soak start
    SoakOrder,
    /// Peak is below soak end
    PeakOrder,
    /// Preheat or soak duration is zero
    ZeroDuration,
    /// Ramp-up slope is not positive
    RampUpSlope,
    /// Ramp-down slope is not negative
    RampDownSlope,
    /// Slot is locked against edits
    Locked,
    /// No such slot
    IndexOutOfRange,
}

/// A reflow time/temperature curve
///
/// Temperatures are °C, durations seconds, slopes °C per second (one
/// sequencer tick).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolderProfile {
    pub description: Description,
    /// Edits allowed
    pub unlocked: bool,
    /// Melting point of the paste
    pub liquidus: i16,
    pub preheat_time: u16,
    /// Soak start temperature
    pub soak_temp1: i16,
    /// Soak end temperature
    pub soak_temp2: i16,
    pub soak_time: u16,
    pub ramp_up_slope: f32,
    pub peak_temp: i16,
    pub peak_dwell: u16,
    /// Negative
    pub ramp_down_slope: f32,
}

impl SolderProfile {
    /// Check ordering of temperatures and sign of slopes
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.soak_temp2 < self.soak_temp1 {
            return Err(ProfileError::SoakOrder);
        }
        if self.peak_temp < self.soak_temp2 {
            return Err(ProfileError::PeakOrder);
        }
        if self.preheat_time == 0 || self.soak_time == 0 {
            return Err(ProfileError::ZeroDuration);
        }
        if !(self.ramp_up_slope > 0.0) {
            return Err(ProfileError::RampUpSlope);
        }
        if !(self.ramp_down_slope < 0.0) {
            return Err(ProfileError::RampDownSlope);
        }
        Ok(())
    }

    /// Nominal run length in seconds when the oven tracks perfectly
    pub fn nominal_duration(&self, ambient: f32) -> u32 {
        let ramp_up = (self.peak_temp - self.soak_temp2) as f32 / self.ramp_up_slope;
        let ramp_down = (self.peak_temp as f32 - ambient) / -self.ramp_down_slope;
        self.preheat_time as u32
            + self.soak_time as u32
            + libm::roundf(ramp_up) as u32
            + self.peak_dwell as u32
            + libm::roundf(ramp_down) as u32
    }
}

/// Flag bit marking an unlocked profile in the remote protocol
pub const FLAG_UNLOCKED: u8 = 1 << 0;
