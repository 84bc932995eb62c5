//! GPIO outputs for the RP2040

use embassy_rp::gpio::{Level, Output};
use liquidus_hal::OutputPin;

/// Push-pull output driving one relay input
pub struct Rp2040Output<'d> {
    pin: Output<'d>,
}

impl<'d> Rp2040Output<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }

    /// Configure `pin` as an output at `initial`
    pub fn from_pin(pin: embassy_rp::Peri<'d, impl embassy_rp::gpio::Pin>, initial: Level) -> Self {
        Self::new(Output::new(pin, initial))
    }
}

impl OutputPin for Rp2040Output<'_> {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}
