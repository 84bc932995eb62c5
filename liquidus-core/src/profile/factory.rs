//! Factory profile table
//!
//! Seeded into flash on a freshly partitioned part. The first slots carry
//! curves for common pastes and are locked; the rest are editable blanks.

use super::solder::{Description, SolderProfile};
use super::MAX_PROFILES;

/// Kester/AIM style 63Sn/37Pb, 90 s soak
pub const SN63PB37_A: SolderProfile = SolderProfile {
    description: Description::new("4300 63SN/37PB-a"),
    unlocked: false,
    liquidus: 183,
    preheat_time: 115,
    soak_temp1: 140,
    soak_temp2: 183,
    soak_time: 90,
    ramp_up_slope: 1.4,
    peak_temp: 210,
    peak_dwell: 15,
    ramp_down_slope: -3.0,
};

/// 63Sn/37Pb with a longer soak
pub const SN63PB37_B: SolderProfile = SolderProfile {
    description: Description::new("4300 63SN/37PB-b"),
    soak_time: 120,
    ..SN63PB37_A
};

/// Low-temperature lead-free
pub const NC31_LOW_TEMP: SolderProfile = SolderProfile {
    description: Description::new("NC-31 LOW-TEMP LF"),
    unlocked: false,
    liquidus: 140,
    preheat_time: 65,
    soak_temp1: 90,
    soak_temp2: 140,
    soak_time: 75,
    ramp_up_slope: 3.0,
    peak_temp: 160,
    peak_dwell: 15,
    ramp_down_slope: -3.0,
};

/// SAC lead-free
pub const SYNTECH_LF: SolderProfile = SolderProfile {
    description: Description::new("AMTECH SYNTECH-LF"),
    unlocked: false,
    liquidus: 219,
    preheat_time: 115,
    soak_temp1: 140,
    soak_temp2: 200,
    soak_time: 75,
    ramp_up_slope: 3.0,
    peak_temp: 240,
    peak_dwell: 20,
    ramp_down_slope: -3.0,
};

/// Editable blank
pub const EMPTY: SolderProfile = SolderProfile {
    description: Description::new("Empty"),
    unlocked: true,
    liquidus: 183,
    preheat_time: 144,
    soak_temp1: 140,
    soak_temp2: 183,
    soak_time: 90,
    ramp_up_slope: 1.4,
    peak_temp: 220,
    peak_dwell: 10,
    ramp_down_slope: -3.0,
};

const TABLE: [SolderProfile; 4] = [SN63PB37_A, SN63PB37_B, NC31_LOW_TEMP, SYNTECH_LF];

/// Factory content of `slot`
pub fn profile(slot: usize) -> SolderProfile {
    debug_assert!(slot < MAX_PROFILES);
    TABLE.get(slot).copied().unwrap_or(EMPTY)
}
