//! Solid-state relay outputs
//!
//! Heater and fan are mains loads behind zero-cross SSRs. The relay only
//! changes state at the next zero crossing, so the pin is simply held at
//! the level chosen for the coming half-cycle.

use liquidus_core::pwm::OutputLevels;
use liquidus_core::traits::SwitchOutput;
use liquidus_hal::OutputPin;

/// One SSR on a GPIO pin
///
/// Active-high by default; some relay boards pull the input low to switch.
pub struct SsrOutput<P> {
    pin: P,
    /// Load on = pin low
    inverted: bool,
    on: bool,
}

impl<P: OutputPin> SsrOutput<P> {
    /// Wrap `pin`; the load starts off
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut output = Self {
            pin,
            inverted,
            on: false,
        };
        output.set_on(false);
        output
    }

    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, false)
    }

    pub fn new_active_low(pin: P) -> Self {
        Self::new(pin, true)
    }
}

impl<P: OutputPin> SwitchOutput for SsrOutput<P> {
    fn set_on(&mut self, on: bool) {
        self.on = on;
        self.pin.set_state(on != self.inverted);
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Heater and fan relays driven together from one zero-crossing step
pub struct SsrPair<H, F> {
    heater: H,
    fan: F,
}

impl<H: SwitchOutput, F: SwitchOutput> SsrPair<H, F> {
    pub fn new(heater: H, fan: F) -> Self {
        let mut pair = Self { heater, fan };
        pair.off();
        pair
    }

    /// Set both relays for the coming half-cycle
    pub fn apply(&mut self, levels: OutputLevels) {
        self.heater.set_on(levels.heater);
        self.fan.set_on(levels.fan);
    }

    /// Both loads off
    pub fn off(&mut self) {
        self.apply(OutputLevels {
            heater: false,
            fan: false,
        });
    }

    pub fn levels(&self) -> OutputLevels {
        OutputLevels {
            heater: self.heater.is_on(),
            fan: self.fan.is_on(),
        }
    }
}
