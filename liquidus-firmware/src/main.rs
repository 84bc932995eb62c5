//! Liquidus - Reflow Oven Controller Firmware
//!
//! Main firmware binary for RP2040-based reflow oven controllers: four
//! MAX31855 thermocouples on one SPI bus, heater and convection fan on
//! zero-cross solid-state relays, and a PWM electronics fan.
//!
//! Named after the liquidus temperature, the point above which a solder
//! alloy is fully molten.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_embedded_hal::shared_bus::blocking::spi::SpiDevice;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use liquidus_core::storage::{FlashDriver, InitOutcome};
use liquidus_core::Oven;
use liquidus_drivers::output::{SsrOutput, SsrPair};
use liquidus_drivers::thermocouple::Max31855;
use liquidus_hal_rp2040::{Rp2040Eeprom, Rp2040Output};

use crate::channels::{OvenMutex, Probe, Relay, ThermocoupleBus, PWM_SHARED};

#[macro_use]
mod board;
mod channels;
mod tasks;

// Static cells (must live forever for task references)
static FLASH_DRIVER: StaticCell<FlashDriver<Rp2040Eeprom<'static>>> = StaticCell::new();
static SPI_BUS: StaticCell<ThermocoupleBus> = StaticCell::new();
static OVEN: StaticCell<OvenMutex> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Liquidus firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Relays first, so the heater is off before anything else can fail.
    // An active-low relay is released by driving its pin high.
    let io = take_board!(p);
    let heater: Relay = SsrOutput::new(
        Rp2040Output::from_pin(io.heater, Level::from(board::HEATER_ACTIVE_LOW)),
        board::HEATER_ACTIVE_LOW,
    );
    let fan: Relay = SsrOutput::new(
        Rp2040Output::from_pin(io.fan, Level::from(board::FAN_ACTIVE_LOW)),
        board::FAN_ACTIVE_LOW,
    );
    let relays = SsrPair::new(heater, fan);
    PWM_SHARED.stop();

    // Settings store
    let eeprom = Rp2040Eeprom::new(p.FLASH, p.DMA_CH0);
    let driver = FLASH_DRIVER.init(FlashDriver::new(eeprom));
    let outcome = match driver.initialize(board::EEPROM_SIZE, board::PARTITION_SPLIT) {
        Ok(outcome) => {
            info!("Settings store ready: {}", outcome);
            Some(outcome)
        }
        Err(e) => {
            error!("Settings store failed: {}", e);
            None
        }
    };
    let driver: &'static FlashDriver<_> = driver;

    // Thermocouples: one bus, one chip select per converter
    let bus: &'static ThermocoupleBus = SPI_BUS.init(BlockingMutex::new(RefCell::new(io.spi)));
    let [cs0, cs1, cs2, cs3] = io.cs;
    let probe = move |cs| -> Probe {
        Max31855::new(SpiDevice::new(bus, Output::new(cs, Level::High)))
    };
    let probes = [probe(cs0), probe(cs1), probe(cs2), probe(cs3)];

    let mut oven = match Oven::new(driver, &PWM_SHARED, probes) {
        Ok(oven) => oven,
        Err(e) => {
            // Layout does not fit the configured window
            error!("Settings layout failed: {}", e);
            loop {
                cortex_m::asm::wfi();
            }
        }
    };

    if outcome == Some(InitOutcome::FreshlyPartitioned) {
        info!("Fresh settings store, seeding factory defaults");
        if let Err(e) = oven.seed_defaults() {
            error!("Seeding defaults failed: {}", e);
        }
    }
    if let Some(fault) = oven.storage_fault() {
        warn!("Storage fault latched ({}), settings are read-only", fault);
    }

    info!(
        "Profile {} selected, oven at {}C",
        oven.current_profile_index(),
        oven.current_data_point().average_temperature()
    );

    let oven: &'static OvenMutex = OVEN.init(Mutex::new(oven));

    let zero_cross = Input::new(io.zero_cross, Pull::None);

    let buzzer = Rp2040Output::from_pin(io.buzzer, Level::Low);

    spawner.spawn(tasks::zero_crossing_task(zero_cross, relays)).unwrap();
    spawner.spawn(tasks::sequencer_task(oven, buzzer)).unwrap();
    spawner.spawn(tasks::pid_task(oven)).unwrap();
    spawner.spawn(tasks::case_fan_task(oven, io.case_fan)).unwrap();

    info!("All tasks spawned");
}
