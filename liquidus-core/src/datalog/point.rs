//! Packed data point
//!
//! Status word layout:
//!
//! ```text
//!  15..4  channel fault codes, 3 bits each, channel 0 in bits 6..4
//!   3..0  controller state
//! ```
//!
//! Temperatures are stored in hundredths of a degree; a NaN reading is
//! stored as 0 and recovered from the channel's fault code.

use crate::sensor::{FaultCode, Measurement, CHANNEL_COUNT};
use crate::state::ControllerState;

const STATE_MASK: u16 = 0x000F;
const FAULT_SHIFT: u32 = 4;
const FAULT_BITS: u32 = 3;
const FAULT_MASK: u16 = 0b111;

/// Snapshot of one second of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataPoint {
    status: u16,
    heater: u8,
    fan: u8,
    target: u16,
    temperatures: [u16; CHANNEL_COUNT],
}

impl DataPoint {
    pub fn new(
        state: ControllerState,
        target: f32,
        heater: u8,
        fan: u8,
        measurement: &Measurement,
    ) -> Self {
        let mut status = state.bits() as u16 & STATE_MASK;
        let mut temperatures = [0u16; CHANNEL_COUNT];
        for (i, reading) in measurement.readings.iter().enumerate() {
            status |= (reading.fault.bits() as u16 & FAULT_MASK) << (FAULT_SHIFT + FAULT_BITS * i as u32);
            temperatures[i] = to_centi(reading.temperature);
        }

        Self {
            status,
            heater,
            fan,
            target: to_centi(target),
            temperatures,
        }
    }

    pub fn state(&self) -> ControllerState {
        ControllerState::from_bits((self.status & STATE_MASK) as u8).unwrap_or(ControllerState::Off)
    }

    /// Fault code of `channel`
    pub fn fault(&self, channel: usize) -> FaultCode {
        let shift = FAULT_SHIFT + FAULT_BITS * channel as u32;
        let bits = ((self.status >> shift) & FAULT_MASK) as u8;
        FaultCode::from_bits(bits).unwrap_or(FaultCode::NoResponse)
    }

    /// Temperature of `channel`, NaN unless its fault code is OK
    pub fn temperature(&self, channel: usize) -> f32 {
        if channel >= CHANNEL_COUNT || self.fault(channel) != FaultCode::Ok {
            return f32::NAN;
        }
        from_centi(self.temperatures[channel])
    }

    pub fn target(&self) -> f32 {
        from_centi(self.target)
    }

    pub fn heater(&self) -> u8 {
        self.heater
    }

    pub fn fan(&self) -> u8 {
        self.fan
    }

    pub fn status_word(&self) -> u16 {
        self.status
    }

    /// Mean temperature of the OK channels, NaN if none
    pub fn average_temperature(&self) -> f32 {
        let (sum, count) = (0..CHANNEL_COUNT)
            .filter(|&i| self.fault(i) == FaultCode::Ok)
            .fold((0.0f32, 0u32), |(sum, count), i| {
                (sum + from_centi(self.temperatures[i]), count + 1)
            });
        if count == 0 {
            f32::NAN
        } else {
            sum / count as f32
        }
    }

    /// Largest of the target and the stored channel temperatures
    pub fn maximum(&self) -> f32 {
        let hottest = self.temperatures.iter().copied().max().unwrap_or(0);
        from_centi(hottest.max(self.target))
    }
}

fn to_centi(value: f32) -> u16 {
    // `as` saturates: negatives and NaN become 0
    libm::roundf(value * 100.0) as u16
}

fn from_centi(value: u16) -> f32 {
    value as f32 / 100.0
}
