//! Electronics case fan
//!
//! The controller board has its own fan. Its duty follows the cold-junction
//! temperature of the on-board converter.

/// Case temperature at which the fan starts
pub const CASE_FAN_START_C: f32 = 35.0;

/// Case temperature at which the fan is fully on
pub const CASE_FAN_FULL_C: f32 = 45.0;

/// Slowest duty the fan is run at
pub const CASE_FAN_MIN_DUTY: i32 = 10;

/// Interval between case fan updates, seconds
pub const CASE_FAN_INTERVAL_S: u64 = 5;

/// Case fan duty, percent, for a case temperature in °C
pub fn case_fan_duty(case_temperature: f32) -> u8 {
    if case_temperature.is_nan() {
        return 100;
    }
    let ramp = 100.0 * (case_temperature - CASE_FAN_START_C) / (CASE_FAN_FULL_C - CASE_FAN_START_C);
    let duty = CASE_FAN_MIN_DUTY + ramp as i32;
    if duty < CASE_FAN_MIN_DUTY {
        0
    } else {
        duty.min(100) as u8
    }
}
