//! EEPROM emulation for RP2040
//!
//! The RP2040 has no EEPROM block, so the shadow window lives in RAM and
//! is mirrored into the last 64 KiB of QSPI flash with sequential-storage.
//! Two records are kept: the partition (size class and split) and an
//! image of the window. Every write stores a fresh image; wear leveling
//! is sequential-storage's job.
//!
//! Commits run to completion inside [`EepromController::write`], so the
//! controller always reports ready afterwards.

use core::cell::RefCell;

use embassy_futures::block_on;
use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use liquidus_hal::flash::{
    EepromController, EepromSize, FlashCommand, FlashError, PartitionSplit, StorageKey,
};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB on the controller board
pub const BACKING_SIZE: usize = 64 * 1024;
pub const BACKING_START: usize = FLASH_SIZE - BACKING_SIZE;

/// Flash range holding both records
pub const BACKING_RANGE: core::ops::Range<u32> = (BACKING_START as u32)..(FLASH_SIZE as u32);

/// Largest window this emulation will back
pub const MAX_WINDOW: usize = 2048;

/// Scratch for one record: key, length and window image
const RECORD_BUFFER: usize = MAX_WINDOW + 32;

type RpFlash<'d> = Flash<'d, FLASH, Async, FLASH_SIZE>;

struct Inner<'d> {
    flash: RpFlash<'d>,
    shadow: [u8; MAX_WINDOW],
    /// Window size once partitioned
    window: Option<usize>,
    split: Option<PartitionSplit>,
    buffer: [u8; RECORD_BUFFER],
}

/// RP2040 EEPROM emulation
pub struct Rp2040Eeprom<'d> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner<'d>>>,
}

impl<'d> Rp2040Eeprom<'d> {
    /// Take the flash and restore the window from the last stored image
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        let mut inner = Inner {
            flash: Flash::new(flash, dma),
            shadow: [0xFF; MAX_WINDOW],
            window: None,
            split: None,
            buffer: [0; RECORD_BUFFER],
        };
        inner.restore();
        Self {
            inner: Mutex::new(RefCell::new(inner)),
        }
    }

    /// Split recorded by the last partition command
    ///
    /// The window is always backed by the full [`BACKING_RANGE`]; there is
    /// no data flash to hand back on this part.
    pub fn split(&self) -> Option<PartitionSplit> {
        self.inner.lock(|inner| inner.borrow().split)
    }
}

impl Inner<'_> {
    fn restore(&mut self) {
        let partition = block_on(map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            BACKING_RANGE,
            &mut NoCache::new(),
            &mut self.buffer,
            &StorageKey::Partition,
        ));
        let Ok(Some(&[size, split])) = partition else {
            #[cfg(feature = "defmt")]
            defmt::info!("eeprom: no partition record");
            return;
        };
        let Some(window) = size_from_code(size).map(EepromSize::bytes) else {
            return;
        };
        self.window = Some(window);
        self.split = split_from_code(split);

        let image = block_on(map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            BACKING_RANGE,
            &mut NoCache::new(),
            &mut self.buffer,
            &StorageKey::Shadow,
        ));
        if let Ok(Some(image)) = image {
            let len = image.len().min(window);
            self.shadow[..len].copy_from_slice(&image[..len]);
        }

        #[cfg(feature = "defmt")]
        defmt::info!("eeprom: restored {} byte window", window);
    }

    fn store(&mut self, key: StorageKey, len: usize) -> Result<(), FlashError> {
        let data: &[u8] = &self.shadow[..len];
        block_on(map::store_item(
            &mut self.flash,
            BACKING_RANGE,
            &mut NoCache::new(),
            &mut self.buffer,
            &key,
            &data,
        ))
        .map_err(|_| FlashError::CommandFailed)
    }

    fn partition(&mut self, size: EepromSize, split: PartitionSplit) -> Result<(), FlashError> {
        let window = size.bytes();
        if window > MAX_WINDOW || split == PartitionSplit::FlashOnly {
            return Err(FlashError::IllegalParams);
        }

        block_on(self.flash.erase(BACKING_RANGE.start, BACKING_RANGE.end))
            .map_err(|_| FlashError::AccessError)?;

        let record: &[u8] = &[size.code(), split.code()];
        block_on(map::store_item(
            &mut self.flash,
            BACKING_RANGE,
            &mut NoCache::new(),
            &mut self.buffer,
            &StorageKey::Partition,
            &record,
        ))
        .map_err(|_| FlashError::CommandFailed)?;

        self.shadow = [0xFF; MAX_WINDOW];
        self.window = Some(window);
        self.split = Some(split);
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), FlashError> {
        block_on(self.flash.erase(BACKING_RANGE.start, BACKING_RANGE.end))
            .map_err(|_| FlashError::AccessError)?;
        self.shadow = [0xFF; MAX_WINDOW];
        self.window = None;
        self.split = None;
        Ok(())
    }
}

impl EepromController for Rp2040Eeprom<'_> {
    fn read(&self, offset: usize, buf: &mut [u8]) {
        self.inner.lock(|inner| {
            let inner = inner.borrow();
            let end = (offset + buf.len()).min(MAX_WINDOW);
            let len = end.saturating_sub(offset);
            buf[..len].copy_from_slice(&inner.shadow[offset.min(end)..end]);
            buf[len..].fill(0xFF);
        })
    }

    fn write(&self, offset: usize, data: &[u8]) -> Result<(), FlashError> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            let window = inner.window.ok_or(FlashError::NotConfigured)?;
            let end = offset
                .checked_add(data.len())
                .filter(|&end| end <= window)
                .ok_or(FlashError::IllegalParams)?;
            inner.shadow[offset..end].copy_from_slice(data);
            inner.store(StorageKey::Shadow, window)
        })
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn is_configured(&self) -> bool {
        self.inner.lock(|inner| inner.borrow().window.is_some())
    }

    fn execute(&self, command: FlashCommand) -> Result<(), FlashError> {
        #[cfg(feature = "defmt")]
        defmt::info!("eeprom: command {}", command);

        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            match command {
                FlashCommand::ProgramPartition { size, split } => inner.partition(size, split),
                FlashCommand::EraseAll => inner.erase_all(),
            }
        })
    }

    fn pause_ms(&self, ms: u32) {
        // 125 MHz core clock
        cortex_m::asm::delay(ms.saturating_mul(125_000));
    }
}

fn size_from_code(code: u8) -> Option<EepromSize> {
    [
        EepromSize::Bytes32,
        EepromSize::Bytes64,
        EepromSize::Bytes128,
        EepromSize::Bytes256,
        EepromSize::Bytes512,
        EepromSize::Kib1,
        EepromSize::Kib2,
        EepromSize::Kib4,
    ]
    .into_iter()
    .find(|size| size.code() == code)
}

fn split_from_code(code: u8) -> Option<PartitionSplit> {
    [
        PartitionSplit::FlashOnly,
        PartitionSplit::Half,
        PartitionSplit::BackingOnly,
    ]
    .into_iter()
    .find(|split| split.code() == code)
}
