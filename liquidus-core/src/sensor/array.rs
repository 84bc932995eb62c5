//! Thermocouple array
//!
//! The oven carries several thermocouples; control runs on their mean.

use liquidus_hal::EepromController;

use super::thermocouple::{ThermocoupleChannel, ThermocoupleReading};
use crate::traits::ThermocoupleProbe;

/// Number of thermocouple channels
pub const CHANNEL_COUNT: usize = 4;

/// Mean temperature of the channels reporting OK, or NaN if none do
pub fn mean_of_ok(readings: &[ThermocoupleReading]) -> f32 {
    let (sum, count) = readings
        .iter()
        .filter(|r| r.is_ok())
        .fold((0.0f32, 0u32), |(sum, count), r| (sum + r.temperature, count + 1));

    if count == 0 {
        f32::NAN
    } else {
        sum / count as f32
    }
}

/// One sample of every channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    pub readings: [ThermocoupleReading; CHANNEL_COUNT],
}

impl Measurement {
    pub const NONE: Self = Self {
        readings: [ThermocoupleReading::NO_RESPONSE; CHANNEL_COUNT],
    };

    /// Mean of the OK channels, NaN if none are usable
    pub fn aggregate(&self) -> f32 {
        mean_of_ok(&self.readings)
    }
}

/// All thermocouple channels of the oven
pub struct ThermocoupleArray<'a, P, C> {
    channels: [ThermocoupleChannel<'a, P, C>; CHANNEL_COUNT],
    last: Measurement,
}

impl<'a, P: ThermocoupleProbe, C: EepromController> ThermocoupleArray<'a, P, C> {
    pub fn new(channels: [ThermocoupleChannel<'a, P, C>; CHANNEL_COUNT]) -> Self {
        Self {
            channels,
            last: Measurement::NONE,
        }
    }

    /// Sample every channel and remember the result
    pub fn sample(&mut self) -> Measurement {
        for (reading, channel) in self.last.readings.iter_mut().zip(self.channels.iter_mut()) {
            *reading = channel.sample();
        }
        self.last
    }

    /// Sample every channel and return the aggregate temperature
    pub fn temperature(&mut self) -> f32 {
        self.sample().aggregate()
    }

    /// Aggregate of the last sample
    pub fn aggregate(&self) -> f32 {
        self.last.aggregate()
    }

    /// Greater of the last aggregate and `target`, for display scaling
    pub fn maximum(&self, target: f32) -> f32 {
        // f32::max ignores a NaN operand
        self.aggregate().max(target)
    }

    /// Last sample without touching the bus
    pub fn last(&self) -> &Measurement {
        &self.last
    }

    /// Temperature inside the controller case
    ///
    /// The first converter sits on the controller board, so its cold
    /// junction tracks the case. Reads 0 when that converter is silent.
    pub fn case_temperature(&mut self) -> f32 {
        let cold = self.channels[0].sample().cold_junction;
        if cold.is_nan() {
            0.0
        } else {
            cold
        }
    }

    pub fn channel(&self, index: usize) -> Option<&ThermocoupleChannel<'a, P, C>> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut ThermocoupleChannel<'a, P, C>> {
        self.channels.get_mut(index)
    }

    pub fn channels_mut(&mut self) -> &mut [ThermocoupleChannel<'a, P, C>; CHANNEL_COUNT] {
        &mut self.channels
    }
}
