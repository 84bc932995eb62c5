//! Persisted profile slots

use heapless::Vec;
use liquidus_hal::EepromController;

use super::factory;
use super::solder::{Description, ProfileError, SolderProfile, DESCRIPTION_LEN};
use super::MAX_PROFILES;
use crate::storage::{DurableArray, DurableCell, NvLayout, StorageError};

/// Errors from profile slot access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileSlotError {
    Profile(ProfileError),
    Storage(StorageError),
}

impl From<ProfileError> for ProfileSlotError {
    fn from(e: ProfileError) -> Self {
        ProfileSlotError::Profile(e)
    }
}

impl From<StorageError> for ProfileSlotError {
    fn from(e: StorageError) -> Self {
        ProfileSlotError::Storage(e)
    }
}

/// One profile slot, field by field in durable cells
///
/// Fields commit one at a time; a failed store can leave a slot mixing
/// old and new values.
pub struct NvProfile<'a, C> {
    description: DurableArray<'a, u8, C, DESCRIPTION_LEN>,
    unlocked: DurableCell<'a, bool, C>,
    liquidus: DurableCell<'a, i16, C>,
    preheat_time: DurableCell<'a, u16, C>,
    soak_temp1: DurableCell<'a, i16, C>,
    soak_temp2: DurableCell<'a, i16, C>,
    soak_time: DurableCell<'a, u16, C>,
    ramp_up_slope: DurableCell<'a, f32, C>,
    peak_temp: DurableCell<'a, i16, C>,
    peak_dwell: DurableCell<'a, u16, C>,
    ramp_down_slope: DurableCell<'a, f32, C>,
}

impl<'a, C: EepromController> NvProfile<'a, C> {
    pub fn allocate(layout: &mut NvLayout<'a, C>) -> Result<Self, StorageError> {
        Ok(Self {
            description: layout.array()?,
            unlocked: layout.cell()?,
            liquidus: layout.cell()?,
            preheat_time: layout.cell()?,
            soak_temp1: layout.cell()?,
            soak_temp2: layout.cell()?,
            soak_time: layout.cell()?,
            ramp_up_slope: layout.cell()?,
            peak_temp: layout.cell()?,
            peak_dwell: layout.cell()?,
            ramp_down_slope: layout.cell()?,
        })
    }

    pub fn load(&self) -> SolderProfile {
        SolderProfile {
            description: Description::from_bytes(self.description.to_array()),
            unlocked: self.unlocked.read(),
            liquidus: self.liquidus.read(),
            preheat_time: self.preheat_time.read(),
            soak_temp1: self.soak_temp1.read(),
            soak_temp2: self.soak_temp2.read(),
            soak_time: self.soak_time.read(),
            ramp_up_slope: self.ramp_up_slope.read(),
            peak_temp: self.peak_temp.read(),
            peak_dwell: self.peak_dwell.read(),
            ramp_down_slope: self.ramp_down_slope.read(),
        }
    }

    /// Write every field; no validation or lock check
    pub fn store(&mut self, profile: &SolderProfile) -> Result<(), StorageError> {
        self.description.write_all(profile.description.as_bytes())?;
        self.unlocked.write(profile.unlocked)?;
        self.liquidus.write(profile.liquidus)?;
        self.preheat_time.write(profile.preheat_time)?;
        self.soak_temp1.write(profile.soak_temp1)?;
        self.soak_temp2.write(profile.soak_temp2)?;
        self.soak_time.write(profile.soak_time)?;
        self.ramp_up_slope.write(profile.ramp_up_slope)?;
        self.peak_temp.write(profile.peak_temp)?;
        self.peak_dwell.write(profile.peak_dwell)?;
        self.ramp_down_slope.write(profile.ramp_down_slope)
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.read()
    }
}

/// All profile slots
pub struct ProfileTable<'a, C> {
    slots: Vec<NvProfile<'a, C>, MAX_PROFILES>,
}

impl<'a, C: EepromController> ProfileTable<'a, C> {
    pub fn allocate(layout: &mut NvLayout<'a, C>) -> Result<Self, StorageError> {
        let mut slots = Vec::new();
        for _ in 0..MAX_PROFILES {
            // Capacity equals the loop count
            let _ = slots.push(NvProfile::allocate(layout)?);
        }
        Ok(Self { slots })
    }

    /// Write the factory table into every slot
    pub fn seed_defaults(&mut self) -> Result<(), StorageError> {
        for (slot, nv) in self.slots.iter_mut().enumerate() {
            nv.store(&factory::profile(slot))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<SolderProfile, ProfileError> {
        self.slots
            .get(index)
            .map(NvProfile::load)
            .ok_or(ProfileError::IndexOutOfRange)
    }

    /// Replace an unlocked slot with a valid profile
    pub fn set(&mut self, index: usize, profile: &SolderProfile) -> Result<(), ProfileSlotError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ProfileError::IndexOutOfRange)?;
        if !slot.is_unlocked() {
            return Err(ProfileError::Locked.into());
        }
        profile.validate()?;
        slot.store(profile)?;
        Ok(())
    }
}
