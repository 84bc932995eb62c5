//! Solder profiles
//!
//! - [`solder`] - the profile value type and its validation
//! - [`factory`] - profiles shipped with the oven
//! - [`table`] - persisted profile slots

pub mod factory;
pub mod solder;
pub mod table;

pub use solder::{Description, ProfileError, SolderProfile, DESCRIPTION_LEN, FLAG_UNLOCKED};
pub use table::{NvProfile, ProfileSlotError, ProfileTable};

/// Number of profile slots
pub const MAX_PROFILES: usize = 10;
