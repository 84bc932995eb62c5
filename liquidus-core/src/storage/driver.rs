//! Flash command driver
//!
//! Owns the EEPROM-emulation controller, sequences commands, and turns
//! controller failures into the process-wide storage fault.

use liquidus_hal::{EepromController, EepromSize, FlashCommand, FlashError, PartitionSplit};

use super::fault::FaultLatch;
use super::layout::NvLayout;
use super::StorageError;

/// Longest time to wait for the controller to report ready
pub const READY_TIMEOUT_MS: u32 = 2000;

/// Pause between readiness polls
const POLL_INTERVAL_MS: u32 = 1;

/// Backing flash needed per byte of shadow window
const BACKING_RATIO: usize = 16;

/// Result of [`FlashDriver::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitOutcome {
    /// Partition already present, cells hold their committed values
    AlreadyConfigured,
    /// Partition was just created; every cell must be seeded
    FreshlyPartitioned,
}

/// Flash command driver
///
/// There is one per controller. Durable cells borrow it, so it has to
/// outlive every cell carved out of its window.
pub struct FlashDriver<C> {
    controller: C,
    fault: FaultLatch,
    window: usize,
}

impl<C: EepromController> FlashDriver<C> {
    /// Wrap a controller; call [`FlashDriver::initialize`] before use
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            fault: FaultLatch::new(),
            window: 0,
        }
    }

    /// True if the controller is idle and the shadow window is usable
    pub fn is_backing_configured(&self) -> bool {
        self.controller.is_ready() && self.controller.is_configured()
    }

    /// Bring up the EEPROM emulation
    ///
    /// Issued once at start-up. A [`InitOutcome::FreshlyPartitioned`]
    /// result means the shadow window holds erased flash (all ones) and the
    /// caller must seed factory defaults.
    ///
    /// The window is sized even if bring-up fails, so cells can still be
    /// laid out and read; the latched fault blocks every write.
    pub fn initialize(
        &mut self,
        size: EepromSize,
        split: PartitionSplit,
    ) -> Result<InitOutcome, StorageError> {
        self.window = size.bytes();
        if self.is_backing_configured() {
            return Ok(InitOutcome::AlreadyConfigured);
        }

        if size.bytes() * BACKING_RATIO > split.backing_bytes() {
            return self.fail(FlashError::IllegalParams);
        }

        self.wait_ready()?;
        self.execute(FlashCommand::ProgramPartition { size, split })?;
        self.wait_ready()?;

        if !self.controller.is_configured() {
            return self.fail(FlashError::NotConfigured);
        }

        Ok(InitOutcome::FreshlyPartitioned)
    }

    /// Launch a raw controller command
    pub fn execute(&self, command: FlashCommand) -> Result<(), StorageError> {
        self.ensure_healthy()?;
        match self.controller.execute(command) {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    /// Block until the controller reports ready, or time out
    ///
    /// A timeout latches [`FlashError::Timeout`]; nothing is retried.
    pub fn wait_ready(&self) -> Result<(), StorageError> {
        if self.controller.is_ready() {
            return Ok(());
        }

        let mut waited_ms = 0;
        while waited_ms < READY_TIMEOUT_MS {
            self.controller.pause_ms(POLL_INTERVAL_MS);
            waited_ms += POLL_INTERVAL_MS;
            if self.controller.is_ready() {
                return Ok(());
            }
        }

        self.fail(FlashError::Timeout)
    }

    /// Store bytes at `offset` and wait for the commit
    pub fn store(&self, offset: usize, bytes: &[u8]) -> Result<(), StorageError> {
        self.ensure_healthy()?;
        if offset + bytes.len() > self.window {
            return Err(StorageError::OutOfSpace);
        }

        self.wait_ready()?;
        if let Err(e) = self.controller.write(offset, bytes) {
            return self.fail(e);
        }
        self.wait_ready()
    }

    /// Copy bytes out of the shadow window; never blocks
    pub fn load(&self, offset: usize, buf: &mut [u8]) {
        self.controller.read(offset, buf);
    }

    /// Size of the shadow window in bytes (0 before initialization)
    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Allocator for cells in the shadow window
    pub fn layout(&self) -> NvLayout<'_, C> {
        NvLayout::new(self)
    }

    /// Latched storage fault, if any
    pub fn fault(&self) -> Option<FlashError> {
        self.fault.get()
    }

    /// Clear the latched fault so persistence can resume
    pub fn clear_fault(&self) -> Option<FlashError> {
        self.fault.clear()
    }

    /// Access the underlying controller
    pub fn controller(&self) -> &C {
        &self.controller
    }

    fn ensure_healthy(&self) -> Result<(), StorageError> {
        match self.fault.get() {
            Some(fault) => Err(StorageError::Faulted(fault)),
            None => Ok(()),
        }
    }

    fn fail<T>(&self, error: FlashError) -> Result<T, StorageError> {
        #[cfg(feature = "defmt")]
        defmt::warn!("flash fault latched: {}", error);
        self.fault.latch(error);
        Err(StorageError::Flash(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEeprom;

    #[test]
    fn test_fresh_part_is_partitioned() {
        let mut driver = FlashDriver::new(MockEeprom::blank());
        assert!(!driver.is_backing_configured());

        let outcome = driver
            .initialize(EepromSize::Kib1, PartitionSplit::Half)
            .unwrap();
        assert_eq!(outcome, InitOutcome::FreshlyPartitioned);
        assert!(driver.is_backing_configured());
        assert_eq!(driver.window_size(), 1024);
        assert_eq!(driver.controller().commands(), 1);
    }

    #[test]
    fn test_configured_part_is_left_alone() {
        let mut driver = FlashDriver::new(MockEeprom::configured());
        let outcome = driver
            .initialize(EepromSize::Kib1, PartitionSplit::Half)
            .unwrap();
        assert_eq!(outcome, InitOutcome::AlreadyConfigured);
        assert_eq!(driver.controller().commands(), 0);
    }

    #[test]
    fn test_window_too_large_for_backing() {
        let mut driver = FlashDriver::new(MockEeprom::blank());
        // 4 KiB * 16 = 64 KiB does not fit a 32 KiB backing region
        let result = driver.initialize(EepromSize::Kib4, PartitionSplit::Half);
        assert_eq!(result, Err(StorageError::Flash(FlashError::IllegalParams)));
        assert_eq!(driver.fault(), Some(FlashError::IllegalParams));
        assert_eq!(driver.controller().commands(), 0);

        // Still readable, never writable
        assert_eq!(driver.window_size(), 4096);
        assert_eq!(
            driver.store(0, &[1]),
            Err(StorageError::Faulted(FlashError::IllegalParams))
        );
    }

    #[test]
    fn test_store_waits_for_commit() {
        let mut driver = FlashDriver::new(MockEeprom::configured());
        driver
            .initialize(EepromSize::Bytes256, PartitionSplit::Half)
            .unwrap();
        driver.controller().set_commit_polls(5);

        driver.store(10, &[1, 2, 3]).unwrap();
        assert!(driver.controller().is_ready());
        assert_eq!(driver.controller().pauses(), 5);

        let mut buf = [0u8; 3];
        driver.load(10, &mut buf);
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_timeout_latches_fault() {
        let mut driver = FlashDriver::new(MockEeprom::configured());
        driver
            .initialize(EepromSize::Bytes256, PartitionSplit::Half)
            .unwrap();
        driver.controller().set_stuck(true);

        let result = driver.store(0, &[7]);
        assert_eq!(result, Err(StorageError::Flash(FlashError::Timeout)));
        assert_eq!(driver.fault(), Some(FlashError::Timeout));
        assert_eq!(driver.controller().pauses(), READY_TIMEOUT_MS as usize);

        // Persistence stays blocked until the fault is cleared
        driver.controller().set_stuck(false);
        assert_eq!(
            driver.store(0, &[7]),
            Err(StorageError::Faulted(FlashError::Timeout))
        );
        assert_eq!(driver.clear_fault(), Some(FlashError::Timeout));
        assert!(driver.store(0, &[7]).is_ok());
    }

    #[test]
    fn test_store_outside_window() {
        let mut driver = FlashDriver::new(MockEeprom::configured());
        driver
            .initialize(EepromSize::Bytes32, PartitionSplit::Half)
            .unwrap();
        assert_eq!(driver.store(30, &[0; 4]), Err(StorageError::OutOfSpace));
        assert_eq!(driver.fault(), None);
    }

    #[test]
    fn test_controller_write_error_is_latched() {
        let mut driver = FlashDriver::new(MockEeprom::configured());
        driver
            .initialize(EepromSize::Bytes256, PartitionSplit::Half)
            .unwrap();
        driver
            .controller()
            .fail_next_write(FlashError::ProtectionViolation);

        assert_eq!(
            driver.store(0, &[1]),
            Err(StorageError::Flash(FlashError::ProtectionViolation))
        );
        assert_eq!(driver.fault(), Some(FlashError::ProtectionViolation));
    }
}
