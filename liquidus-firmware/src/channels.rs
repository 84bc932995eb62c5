//! State shared between tasks
//!
//! The zero-crossing handler only ever sees [`PWM_SHARED`]. Everything
//! else goes through the oven mutex. Periodic tasks hold it for one tick.
//! Front ends that start, abort or edit also take a
//! [`liquidus_core::InteractiveLock`] first.

use core::cell::RefCell;

use embassy_embedded_hal::shared_bus::blocking::spi::SpiDevice;
use embassy_rp::gpio::Output;
use embassy_rp::spi::{Blocking, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;

use liquidus_core::pwm::PwmShared;
use liquidus_core::Oven;
use liquidus_drivers::output::SsrOutput;
use liquidus_drivers::thermocouple::Max31855;
use liquidus_hal_rp2040::{Rp2040Eeprom, Rp2040Output};

use crate::board::ThermocoupleSpi;

/// Duty targets read by the zero-crossing task
pub static PWM_SHARED: PwmShared = PwmShared::new();

type BusSpi = Spi<'static, ThermocoupleSpi, Blocking>;

/// The thermocouple bus, shared by chip select
pub type ThermocoupleBus = BlockingMutex<CriticalSectionRawMutex, RefCell<BusSpi>>;

/// One converter on the shared bus
pub type Probe = Max31855<SpiDevice<'static, CriticalSectionRawMutex, BusSpi, Output<'static>>>;

/// Heater or fan relay
pub type Relay = SsrOutput<Rp2040Output<'static>>;

pub type OvenContext = Oven<'static, Probe, Rp2040Eeprom<'static>>;

/// The oven, shared by the periodic tasks
pub type OvenMutex = Mutex<CriticalSectionRawMutex, OvenContext>;
