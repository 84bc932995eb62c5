//! Accumulator-based half-cycle modulator
//!
//! Foreground code writes target duties into [`PwmShared`]. The
//! zero-crossing handler owns a [`ZeroCrossingModulator`] and calls it on
//! every edge (twice per mains cycle). All shared state is atomic so the
//! handler never blocks.

use portable_atomic::{AtomicU8, Ordering};

/// Highest duty cycle, percent
const FULL_DUTY: u8 = 100;

/// First-order delta-sigma modulator clocked by zero crossings
///
/// Each edge adds the duty into the accumulator. Whenever that carries
/// past 100 the half-cycle is switched on and 100 is taken back out.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaSigma {
    accumulator: u8,
}

impl DeltaSigma {
    pub const fn new() -> Self {
        Self { accumulator: 0 }
    }

    /// Advance one half-cycle; true if the output is on for it
    pub fn step(&mut self, duty: u8) -> bool {
        let sum = self.accumulator as u16 + duty.min(FULL_DUTY) as u16;
        if sum >= FULL_DUTY as u16 {
            self.accumulator = (sum - FULL_DUTY as u16) as u8;
            true
        } else {
            self.accumulator = sum as u8;
            false
        }
    }

    pub fn reset(&mut self) {
        self.accumulator = 0;
    }
}

/// Output state for one half-cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputLevels {
    pub heater: bool,
    pub fan: bool,
}

/// Duty targets shared between foreground and the zero-crossing handler
pub struct PwmShared {
    heater_duty: AtomicU8,
    fan_duty: AtomicU8,
    kick_remaining: AtomicU8,
}

impl PwmShared {
    pub const fn new() -> Self {
        Self {
            heater_duty: AtomicU8::new(0),
            fan_duty: AtomicU8::new(0),
            kick_remaining: AtomicU8::new(0),
        }
    }

    /// Set heater duty, percent (values above 100 are clamped)
    pub fn set_heater_duty(&self, duty: u8) {
        self.heater_duty.store(duty.min(FULL_DUTY), Ordering::Release);
    }

    /// Set fan duty, percent (values above 100 are clamped)
    ///
    /// Starting the fan from 0 loads a kick of `kick_cycles` half-cycles at
    /// full power. Stopping it cancels any pending kick.
    pub fn set_fan_duty(&self, duty: u8, kick_cycles: u8) {
        let duty = duty.min(FULL_DUTY);
        if duty == 0 {
            self.kick_remaining.store(0, Ordering::Release);
        } else if self.fan_duty.load(Ordering::Acquire) == 0 {
            self.kick_remaining.store(kick_cycles, Ordering::Release);
        }
        self.fan_duty.store(duty, Ordering::Release);
    }

    pub fn heater_duty(&self) -> u8 {
        self.heater_duty.load(Ordering::Acquire)
    }

    pub fn fan_duty(&self) -> u8 {
        self.fan_duty.load(Ordering::Acquire)
    }

    /// Half-cycles of kick still to run
    pub fn kick_remaining(&self) -> u8 {
        self.kick_remaining.load(Ordering::Acquire)
    }

    /// Take one half-cycle of kick, if any is pending
    fn take_kick(&self) -> bool {
        self.kick_remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |k| k.checked_sub(1))
            .is_ok()
    }

    /// Force both loads off
    pub fn stop(&self) {
        self.set_heater_duty(0);
        self.set_fan_duty(0, 0);
    }
}

impl Default for PwmShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-edge state owned by the zero-crossing handler
#[derive(Debug, Default)]
pub struct ZeroCrossingModulator {
    heater: DeltaSigma,
    fan: DeltaSigma,
}

impl ZeroCrossingModulator {
    pub const fn new() -> Self {
        Self {
            heater: DeltaSigma::new(),
            fan: DeltaSigma::new(),
        }
    }

    /// Handle one zero-crossing edge; returns the levels for the next half-cycle
    pub fn on_zero_crossing(&mut self, shared: &PwmShared) -> OutputLevels {
        let heater = self.heater.step(shared.heater_duty());
        let fan = if shared.take_kick() {
            true
        } else {
            self.fan.step(shared.fan_duty())
        };
        OutputLevels { heater, fan }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn count_on(duty: u8, edges: usize) -> usize {
        let mut modulator = DeltaSigma::new();
        (0..edges).filter(|_| modulator.step(duty)).count()
    }

    #[test]
    fn test_extremes() {
        assert_eq!(count_on(0, 200), 0);
        assert_eq!(count_on(100, 200), 200);
        assert_eq!(count_on(250, 10), 10);
    }

    #[test]
    fn test_half_duty_alternates() {
        let mut modulator = DeltaSigma::new();
        let pattern: [bool; 4] = core::array::from_fn(|_| modulator.step(50));
        assert_eq!(pattern, [false, true, false, true]);
    }

    #[test]
    fn test_kick_forces_fan_on() {
        let shared = PwmShared::new();
        let mut modulator = ZeroCrossingModulator::new();

        shared.set_fan_duty(10, 3);
        assert_eq!(shared.kick_remaining(), 3);
        for _ in 0..3 {
            assert!(modulator.on_zero_crossing(&shared).fan);
        }
        assert_eq!(shared.kick_remaining(), 0);

        // Back to 10% after the kick
        let on = (0..100)
            .filter(|_| modulator.on_zero_crossing(&shared).fan)
            .count();
        assert_eq!(on, 10);
    }

    #[test]
    fn test_kick_only_from_stopped() {
        let shared = PwmShared::new();
        shared.set_fan_duty(40, 5);
        shared.set_fan_duty(20, 5);
        // The second change does not reload the kick
        assert_eq!(shared.kick_remaining(), 5);

        let mut modulator = ZeroCrossingModulator::new();
        for _ in 0..5 {
            modulator.on_zero_crossing(&shared);
        }
        shared.set_fan_duty(60, 5);
        assert_eq!(shared.kick_remaining(), 0);
    }

    #[test]
    fn test_stop_cancels_kick() {
        let shared = PwmShared::new();
        shared.set_fan_duty(30, 20);
        shared.set_fan_duty(0, 20);
        assert_eq!(shared.kick_remaining(), 0);

        let mut modulator = ZeroCrossingModulator::new();
        assert!(!modulator.on_zero_crossing(&shared).fan);
    }

    #[test]
    fn test_duty_clamped() {
        let shared = PwmShared::new();
        shared.set_heater_duty(150);
        assert_eq!(shared.heater_duty(), 100);
    }

    proptest! {
        #[test]
        fn prop_duty_fidelity(duty in 0u8..=100, edges in 1usize..2000) {
            let on = count_on(duty, edges) as i64;
            let expected = (edges as f64 * duty as f64 / 100.0).round() as i64;
            prop_assert!((on - expected).abs() <= 1);
        }

        #[test]
        fn prop_heater_independent_of_fan(
            heater in 0u8..=100,
            fan in 0u8..=100,
            kick in 0u8..=50,
        ) {
            let shared = PwmShared::new();
            shared.set_heater_duty(heater);
            shared.set_fan_duty(fan, kick);
            let mut modulator = ZeroCrossingModulator::new();
            let on = (0..500)
                .filter(|_| modulator.on_zero_crossing(&shared).heater)
                .count();
            prop_assert_eq!(on, count_on(heater, 500));
        }
    }
}
