//! Zero-crossing task
//!
//! Every edge of the zero-cross detector is a mains zero crossing. The
//! relays are set for the coming half-cycle right away; zero-cross SSRs
//! only switch at the crossing itself.

use defmt::*;
use embassy_rp::gpio::Input;

use liquidus_core::pwm::ZeroCrossingModulator;
use liquidus_drivers::output::SsrPair;

use crate::channels::{Relay, PWM_SHARED};

#[embassy_executor::task]
pub async fn zero_crossing_task(mut detector: Input<'static>, mut relays: SsrPair<Relay, Relay>) {
    info!("Zero-crossing task started");

    let mut modulator = ZeroCrossingModulator::new();

    loop {
        detector.wait_for_any_edge().await;
        let levels = modulator.on_zero_crossing(&PWM_SHARED);
        relays.apply(levels);
    }
}
