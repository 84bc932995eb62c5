//! Sequencer task
//!
//! Advances the reflow profile once a second, logs state changes and
//! drives the end-of-run buzzer.

use defmt::*;
use embassy_time::{Duration, Ticker};

use liquidus_core::state::ControllerState;
use liquidus_hal_rp2040::{OutputPin, Rp2040Output};

use crate::channels::OvenMutex;

#[embassy_executor::task]
pub async fn sequencer_task(oven: &'static OvenMutex, mut buzzer: Rp2040Output<'static>) {
    info!("Sequencer task started");

    let mut ticker = Ticker::every(Duration::from_secs(1));
    let mut last = ControllerState::Off;

    loop {
        ticker.next().await;

        let mut oven = oven.lock().await;
        let state = oven.tick_second();
        buzzer.set_state(oven.is_beeping());
        if state != last {
            info!(
                "Oven {} -> {} at {}s, target {}",
                last.name(),
                state.name(),
                oven.sequencer().time(),
                oven.sequencer().setpoint()
            );
            last = state;
        }
    }
}
