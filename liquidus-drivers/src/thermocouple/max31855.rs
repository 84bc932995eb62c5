//! MAX31855 cold-junction compensated thermocouple converter
//!
//! Read-only SPI part: pulling CS low latches the last conversion, and 32
//! clocks shift it out MSB first. There is no command byte and nothing to
//! configure. Each converter sits on its own chip select, so each gets its
//! own [`SpiDevice`].

use embedded_hal::spi::SpiDevice;
use liquidus_core::traits::ThermocoupleProbe;

/// One MAX31855 on a shared SPI bus
pub struct Max31855<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Max31855<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Give back the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiDevice> ThermocoupleProbe for Max31855<SPI> {
    type Error = SPI::Error;

    fn read_frame(&mut self) -> Result<[u8; 4], Self::Error> {
        let mut frame = [0u8; 4];
        self.spi.read(&mut frame)?;
        Ok(frame)
    }
}
