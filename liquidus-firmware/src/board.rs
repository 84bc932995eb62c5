//! Board wiring
//!
//! Pin numbers, the SPI bus and storage sizing come from `oven.toml`
//! through build.rs; see [`take_board!`].

use embassy_rp::gpio::AnyPin;
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::spi::{self, Blocking, Spi};
use embassy_rp::Peri;

include!(concat!(env!("OUT_DIR"), "/board.rs"));

/// Case fan PWM wrap: 125 MHz / 5000 = 25 kHz, above hearing
const CASE_FAN_TOP: u16 = 4999;

/// Peripherals the oven uses
pub struct Board {
    /// Shared by the four thermocouple converters
    pub spi: Spi<'static, ThermocoupleSpi, Blocking>,
    pub cs: [Peri<'static, AnyPin>; 4],
    pub heater: Peri<'static, AnyPin>,
    pub fan: Peri<'static, AnyPin>,
    pub zero_cross: Peri<'static, AnyPin>,
    pub buzzer: Peri<'static, AnyPin>,
    pub case_fan: Pwm<'static>,
}

/// MAX31855: mode 0, read only
pub fn spi_config() -> spi::Config {
    let mut config = spi::Config::default();
    config.frequency = SPI_FREQUENCY_HZ;
    config
}

/// Case fan PWM at `duty` percent
pub fn case_fan_config(duty: u8) -> pwm::Config {
    let compare = (CASE_FAN_TOP as u32 + 1) * duty.min(100) as u32 / 100;
    let mut config = pwm::Config::default();
    config.top = CASE_FAN_TOP;
    if CASE_FAN_CHANNEL_A {
        config.compare_a = compare as u16;
    } else {
        config.compare_b = compare as u16;
    }
    config
}
