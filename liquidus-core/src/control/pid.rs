//! Fixed-interval PID controller
//!
//! Runs on a periodic tick while enabled. Integral and output are both
//! hard-clamped to the output range; gains are scaled by the tick interval
//! once, when they are set, so a tick is multiply/add only.

/// Tick interval of the control loop, seconds
pub const PID_INTERVAL_S: f32 = 0.25;

/// Lower bound of the drive command (full fan)
pub const OUTPUT_MIN: f32 = -100.0;

/// Upper bound of the drive command (full heater)
pub const OUTPUT_MAX: f32 = 100.0;

/// Unscaled PID gains
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// Errors from PID configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PidError {
    /// A gain was negative (or NaN)
    NegativeGain,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    interval: f32,
    out_min: f32,
    out_max: f32,
    kp: f32,
    /// Ki × interval
    ki: f32,
    /// Kd / interval
    kd: f32,
    setpoint: f32,
    integral: f32,
    last_input: f32,
    current_input: f32,
    output: f32,
    ticks: u32,
    enabled: bool,
}

impl PidController {
    /// Create a disabled controller with zero gains
    pub const fn new(interval: f32, out_min: f32, out_max: f32) -> Self {
        Self {
            interval,
            out_min,
            out_max,
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            setpoint: 0.0,
            integral: 0.0,
            last_input: 0.0,
            current_input: 0.0,
            output: 0.0,
            ticks: 0,
            enabled: false,
        }
    }

    /// Set gains; negative gains are rejected and the old ones kept
    pub fn set_tunings(&mut self, gains: PidGains) -> Result<(), PidError> {
        // Written as !(x >= 0) so NaN is rejected too
        if !(gains.kp >= 0.0) || !(gains.ki >= 0.0) || !(gains.kd >= 0.0) {
            return Err(PidError::NegativeGain);
        }
        self.kp = gains.kp;
        self.ki = gains.ki * self.interval;
        self.kd = gains.kd / self.interval;
        Ok(())
    }

    /// Gains as configured (unscaled)
    pub fn tunings(&self) -> PidGains {
        PidGains {
            kp: self.kp,
            ki: self.ki / self.interval,
            kd: self.kd * self.interval,
        }
    }

    /// Enable the loop, seeding it from `input`
    ///
    /// Enabling an already running loop changes nothing. A fresh enable
    /// always starts from a zero integral.
    pub fn enable(&mut self, input: f32) {
        if self.enabled {
            return;
        }
        self.current_input = input;
        self.last_input = input;
        self.integral = 0.0;
        self.output = 0.0;
        self.ticks = 0;
        self.enabled = true;
    }

    /// Stop ticking; state is frozen until the next enable
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// New set-point, used from the next tick
    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    /// Run one tick with a fresh `input` sample
    ///
    /// Returns the clamped drive command, or `None` while disabled. A NaN
    /// sample leaves the loop state untouched and yields a drive of 0.
    pub fn update(&mut self, input: f32) -> Option<f32> {
        if !self.enabled {
            return None;
        }
        if input.is_nan() {
            self.output = 0.0;
            return Some(self.output);
        }

        self.ticks = self.ticks.wrapping_add(1);
        self.last_input = self.current_input;
        self.current_input = input;

        let error = self.setpoint - input;

        self.integral = (self.integral + self.ki * error).clamp(self.out_min, self.out_max);

        let derivative = input - self.last_input;
        let output = self.kp * error + self.integral - self.kd * derivative;
        self.output = output.clamp(self.out_min, self.out_max);

        Some(self.output)
    }

    /// Last drive command
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Accumulated integral term
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Last input sample
    pub fn input(&self) -> f32 {
        self.current_input
    }

    /// Seconds since the loop was last enabled
    pub fn elapsed(&self) -> f32 {
        self.ticks as f32 * self.interval
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

impl Default for PidController {
    fn default() -> Self {
        Self::new(PID_INTERVAL_S, OUTPUT_MIN, OUTPUT_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gains(kp: f32, ki: f32, kd: f32) -> PidGains {
        PidGains { kp, ki, kd }
    }

    #[test]
    fn test_disabled_does_nothing() {
        let mut pid = PidController::default();
        assert_eq!(pid.update(20.0), None);
        assert_eq!(pid.ticks(), 0);
    }

    #[test]
    fn test_gains_are_prescaled() {
        let mut pid = PidController::default();
        pid.set_tunings(gains(40.0, 0.05, 62.5)).unwrap();
        let tunings = pid.tunings();
        assert!((tunings.kp - 40.0).abs() < 1e-6);
        assert!((tunings.ki - 0.05).abs() < 1e-6);
        assert!((tunings.kd - 62.5).abs() < 1e-4);
    }

    #[test]
    fn test_negative_gain_rejected() {
        let mut pid = PidController::default();
        pid.set_tunings(gains(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(
            pid.set_tunings(gains(1.0, -0.1, 3.0)),
            Err(PidError::NegativeGain)
        );
        assert_eq!(
            pid.set_tunings(gains(f32::NAN, 0.0, 0.0)),
            Err(PidError::NegativeGain)
        );
        // Old gains kept
        assert!((pid.tunings().ki - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_proportional_response() {
        let mut pid = PidController::default();
        pid.set_tunings(gains(2.0, 0.0, 0.0)).unwrap();
        pid.set_setpoint(50.0);
        pid.enable(40.0);

        assert_eq!(pid.update(40.0), Some(20.0));
        assert_eq!(pid.update(60.0), Some(-20.0));
        assert_eq!(pid.update(0.0), Some(100.0));
    }

    #[test]
    fn test_derivative_on_measurement() {
        let mut pid = PidController::default();
        pid.set_tunings(gains(0.0, 0.0, 1.0)).unwrap();
        pid.set_setpoint(100.0);
        pid.enable(20.0);

        // No input change on the first tick: no derivative kick
        assert_eq!(pid.update(20.0), Some(0.0));
        // Rising 1°C in one 0.25 s tick: -1 / 0.25 = -4
        assert_eq!(pid.update(21.0), Some(-4.0));
    }

    #[test]
    fn test_reenable_reseeds() {
        let mut pid = PidController::default();
        pid.set_tunings(gains(0.0, 1.0, 0.0)).unwrap();
        pid.set_setpoint(100.0);
        pid.enable(20.0);
        for _ in 0..10 {
            pid.update(20.0);
        }
        assert!(pid.integral() > 0.0);
        assert_eq!(pid.ticks(), 10);
        assert!((pid.elapsed() - 2.5).abs() < 1e-6);

        pid.disable();
        assert_eq!(pid.update(20.0), None);
        assert!(pid.integral() > 0.0);

        pid.enable(30.0);
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.ticks(), 0);
        assert_eq!(pid.input(), 30.0);
    }

    #[test]
    fn test_nan_input_holds_state() {
        let mut pid = PidController::default();
        pid.set_tunings(gains(1.0, 1.0, 1.0)).unwrap();
        pid.set_setpoint(100.0);
        pid.enable(20.0);
        pid.update(20.0);
        let integral = pid.integral();

        assert_eq!(pid.update(f32::NAN), Some(0.0));
        assert_eq!(pid.integral(), integral);
        assert_eq!(pid.input(), 20.0);
    }

    proptest! {
        #[test]
        fn prop_output_and_integral_clamped(
            kp in 0.0f32..100.0,
            ki in 0.0f32..10.0,
            kd in 0.0f32..500.0,
            setpoint in -50.0f32..400.0,
            inputs in proptest::collection::vec(-50.0f32..400.0, 1..60),
        ) {
            let mut pid = PidController::default();
            pid.set_tunings(gains(kp, ki, kd)).unwrap();
            pid.set_setpoint(setpoint);
            pid.enable(inputs[0]);

            for input in inputs {
                let output = pid.update(input).unwrap();
                prop_assert!((OUTPUT_MIN..=OUTPUT_MAX).contains(&output));
                prop_assert!((OUTPUT_MIN..=OUTPUT_MAX).contains(&pid.integral()));
            }
        }
    }
}
