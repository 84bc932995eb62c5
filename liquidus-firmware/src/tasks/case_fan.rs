//! Case fan task
//!
//! Keeps the electronics cool regardless of what the oven is doing.

use defmt::*;
use embassy_rp::pwm::Pwm;
use embassy_time::{Duration, Ticker};

use liquidus_core::control::case_fan::CASE_FAN_INTERVAL_S;
use liquidus_core::control::case_fan_duty;

use crate::board::case_fan_config;
use crate::channels::OvenMutex;

#[embassy_executor::task]
pub async fn case_fan_task(oven: &'static OvenMutex, mut fan: Pwm<'static>) {
    info!("Case fan task started");

    let mut ticker = Ticker::every(Duration::from_secs(CASE_FAN_INTERVAL_S));
    let mut last = 0u8;

    loop {
        ticker.next().await;

        let temperature = oven.lock().await.case_temperature();
        let duty = case_fan_duty(temperature);
        if duty != last {
            debug!("Case fan {}% at {}C", duty, temperature);
            fan.set_config(&case_fan_config(duty));
            last = duty;
        }
    }
}
