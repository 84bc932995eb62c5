//! Thermocouple readings and channels
//!
//! Converters deliver a 32-bit big-endian frame:
//!
//! ```text
//!  31..18  probe temperature, signed, 1/4 °C
//!  16      any fault
//!  15..4   cold-junction temperature, signed, 1/16 °C
//!  2..0    fault bits: short to VCC, short to GND, open circuit
//! ```

use liquidus_hal::EepromController;

use crate::config::ChannelSettings;
use crate::storage::StorageError;
use crate::traits::ThermocoupleProbe;

/// All fault bits set: nothing answered on the bus
const NO_RESPONSE_BITS: u8 = 0b111;

/// Per-channel fault classification
///
/// The numeric values are the 3-bit codes stored in data points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultCode {
    Ok = 0,
    OpenCircuit = 1,
    ShortToSupply = 2,
    ShortToGround = 3,
    NoResponse = 4,
    Disabled = 7,
}

impl FaultCode {
    /// Short label for displays and telemetry
    pub fn name(self) -> &'static str {
        match self {
            FaultCode::Ok => "OK",
            FaultCode::OpenCircuit => "Open",
            FaultCode::ShortToSupply => "Vcc",
            FaultCode::ShortToGround => "Gnd",
            FaultCode::NoResponse => "----",
            FaultCode::Disabled => "Dis",
        }
    }

    /// Decode a stored 3-bit code
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0b111 {
            0 => Some(FaultCode::Ok),
            1 => Some(FaultCode::OpenCircuit),
            2 => Some(FaultCode::ShortToSupply),
            3 => Some(FaultCode::ShortToGround),
            4 => Some(FaultCode::NoResponse),
            7 => Some(FaultCode::Disabled),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// One sample from one channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThermocoupleReading {
    /// Probe temperature in °C, offset applied; NaN on any fault
    pub temperature: f32,
    /// Cold-junction temperature in °C; NaN if the converter did not answer
    pub cold_junction: f32,
    pub fault: FaultCode,
}

impl ThermocoupleReading {
    /// Reading for a converter that did not answer
    pub const NO_RESPONSE: Self = Self {
        temperature: f32::NAN,
        cold_junction: f32::NAN,
        fault: FaultCode::NoResponse,
    };

    pub fn is_ok(&self) -> bool {
        self.fault == FaultCode::Ok
    }
}

/// Decode a raw frame, adding `offset` °C to a valid probe temperature
pub fn decode_frame(frame: [u8; 4], offset: f32) -> ThermocoupleReading {
    let status = frame[3] & 0b111;
    if status == NO_RESPONSE_BITS {
        return ThermocoupleReading::NO_RESPONSE;
    }

    let probe_raw = i16::from_be_bytes([frame[0], frame[1]]) >> 2;
    let cold_raw = i16::from_be_bytes([frame[2], frame[3]]) >> 4;
    let cold_junction = cold_raw as f32 / 16.0;

    let fault = if status & 0b001 != 0 {
        FaultCode::OpenCircuit
    } else if status & 0b010 != 0 {
        FaultCode::ShortToGround
    } else if status & 0b100 != 0 {
        FaultCode::ShortToSupply
    } else {
        FaultCode::Ok
    };

    let temperature = if fault == FaultCode::Ok {
        probe_raw as f32 / 4.0 + offset
    } else {
        f32::NAN
    };

    ThermocoupleReading {
        temperature,
        cold_junction,
        fault,
    }
}

/// A probe together with its persisted enable flag and offset
pub struct ThermocoupleChannel<'a, P, C> {
    probe: P,
    settings: ChannelSettings<'a, C>,
}

impl<'a, P: ThermocoupleProbe, C: EepromController> ThermocoupleChannel<'a, P, C> {
    pub fn new(probe: P, settings: ChannelSettings<'a, C>) -> Self {
        Self { probe, settings }
    }

    /// Read and decode one frame
    ///
    /// A disabled channel still reports the cold junction when the
    /// converter answers. Hardware faults take precedence over
    /// `Disabled`. Bus errors count as no response.
    pub fn sample(&mut self) -> ThermocoupleReading {
        let reading = match self.probe.read_frame() {
            Ok(frame) => decode_frame(frame, self.settings.offset.get() as f32),
            Err(_) => ThermocoupleReading::NO_RESPONSE,
        };

        if reading.fault != FaultCode::Ok || self.is_enabled() {
            reading
        } else {
            ThermocoupleReading {
                temperature: f32::NAN,
                cold_junction: reading.cold_junction,
                fault: FaultCode::Disabled,
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled.read()
    }

    pub fn enable(&mut self, enabled: bool) -> Result<(), StorageError> {
        if self.is_enabled() != enabled {
            self.settings.enabled.write(enabled)?;
        }
        Ok(())
    }

    /// Calibration offset, °C
    pub fn offset(&self) -> i16 {
        self.settings.offset.get()
    }

    /// Store a calibration offset, clamped to ±30 °C; returns what was stored
    pub fn set_offset(&mut self, offset: i16) -> Result<i16, StorageError> {
        self.settings.offset.set(offset)
    }

    pub fn seed_defaults(&mut self) -> Result<(), StorageError> {
        self.settings.seed_defaults()
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }
}
