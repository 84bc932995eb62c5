//! PID task
//!
//! Runs the control loop at its fixed interval. The loop itself decides
//! whether it is enabled; this task just keeps time.

use defmt::*;
use embassy_time::{Duration, Ticker};

use liquidus_core::control::PID_INTERVAL_S;

use crate::channels::OvenMutex;

#[embassy_executor::task]
pub async fn pid_task(oven: &'static OvenMutex) {
    info!("PID task started");

    let interval_ms = (PID_INTERVAL_S * 1000.0) as u64;
    let mut ticker = Ticker::every(Duration::from_millis(interval_ms));

    loop {
        ticker.next().await;

        if let Some(duty) = oven.lock().await.pid_tick() {
            trace!("heater {}% fan {}%", duty.heater, duty.fan);
        }
    }
}
