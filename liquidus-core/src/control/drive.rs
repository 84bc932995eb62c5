//! Drive command split
//!
//! The PID produces one signed command in [-100, 100]: positive asks for
//! heat, negative asks for airflow. The oven has two loads, so the command
//! is split into a heater duty and a fan duty here.

/// Heater duty kept on while the fan idles at its minimum speed
const IDLE_HEATER_DUTY: u8 = 10;

/// Heater and fan duty cycles, percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyCycles {
    pub heater: u8,
    pub fan: u8,
}

/// Split a drive command into heater and fan duties
///
/// While heating the fan runs at `minimum_fan` to keep air moving. When
/// cooling is asked for but less than `minimum_fan` of it, the fan stays
/// at the minimum and the heater gets a small duty so the oven coasts
/// instead of cooling harder than requested.
pub fn split_drive(drive: f32, minimum_fan: u8) -> DutyCycles {
    let minimum_fan = minimum_fan.min(100);
    if !(drive < 0.0) {
        // NaN lands here as well and converts to 0
        return DutyCycles {
            heater: to_percent(drive),
            fan: minimum_fan,
        };
    }

    let fan = to_percent(-drive);
    if fan < minimum_fan {
        DutyCycles {
            heater: IDLE_HEATER_DUTY,
            fan: minimum_fan,
        }
    } else {
        DutyCycles { heater: 0, fan }
    }
}

fn to_percent(value: f32) -> u8 {
    // `as` saturates and maps NaN to 0
    (value as u8).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heating() {
        assert_eq!(split_drive(75.0, 30), DutyCycles { heater: 75, fan: 30 });
        assert_eq!(split_drive(0.0, 30), DutyCycles { heater: 0, fan: 30 });
        assert_eq!(split_drive(250.0, 30), DutyCycles { heater: 100, fan: 30 });
    }

    #[test]
    fn test_cooling() {
        assert_eq!(split_drive(-80.0, 30), DutyCycles { heater: 0, fan: 80 });
        assert_eq!(split_drive(-30.0, 30), DutyCycles { heater: 0, fan: 30 });
    }

    #[test]
    fn test_light_cooling_keeps_heater_ticking() {
        assert_eq!(split_drive(-12.0, 30), DutyCycles { heater: 10, fan: 30 });
    }

    #[test]
    fn test_nan_drive_is_safe() {
        assert_eq!(split_drive(f32::NAN, 30), DutyCycles { heater: 0, fan: 30 });
    }
}
