//! Start-up allocation of cells in the shadow window

use liquidus_hal::EepromController;

use super::cell::{DurableArray, DurableCell};
use super::driver::FlashDriver;
use super::value::NvValue;
use super::StorageError;

/// Bump allocator over the shadow window
///
/// Cells are handed out in declaration order, so the layout is stable as
/// long as the order of allocation does not change between firmware
/// versions.
pub struct NvLayout<'a, C> {
    driver: &'a FlashDriver<C>,
    next: usize,
}

impl<'a, C: EepromController> NvLayout<'a, C> {
    pub(crate) fn new(driver: &'a FlashDriver<C>) -> Self {
        Self { driver, next: 0 }
    }

    /// Allocate one cell
    pub fn cell<T: NvValue>(&mut self) -> Result<DurableCell<'a, T, C>, StorageError> {
        let offset = self.reserve(T::SIZE)?;
        Ok(DurableCell::new(self.driver, offset))
    }

    /// Allocate an array of `N` cells
    pub fn array<T: NvValue, const N: usize>(
        &mut self,
    ) -> Result<DurableArray<'a, T, C, N>, StorageError> {
        let offset = self.reserve(T::SIZE * N)?;
        Ok(DurableArray::new(self.driver, offset))
    }

    /// Bytes handed out so far
    pub fn used(&self) -> usize {
        self.next
    }

    fn reserve(&mut self, bytes: usize) -> Result<usize, StorageError> {
        let offset = self.next;
        if offset + bytes > self.driver.window_size() {
            return Err(StorageError::OutOfSpace);
        }
        self.next += bytes;
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEeprom;
    use liquidus_hal::{EepromSize, PartitionSplit};

    #[test]
    fn test_sequential_offsets() {
        let mut driver = FlashDriver::new(MockEeprom::blank());
        driver
            .initialize(EepromSize::Bytes32, PartitionSplit::Half)
            .unwrap();
        let mut layout = driver.layout();

        let a = layout.cell::<u8>().unwrap();
        let b = layout.cell::<f32>().unwrap();
        let c = layout.array::<u16, 3>().unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(b.offset(), 1);
        assert_eq!(c.len(), 3);
        assert_eq!(layout.used(), 11);
    }

    #[test]
    fn test_window_exhausted() {
        let mut driver = FlashDriver::new(MockEeprom::blank());
        driver
            .initialize(EepromSize::Bytes32, PartitionSplit::Half)
            .unwrap();
        let mut layout = driver.layout();

        assert!(layout.array::<u32, 8>().is_ok());
        assert!(matches!(
            layout.cell::<u8>(),
            Err(StorageError::OutOfSpace)
        ));
    }

    #[test]
    fn test_uninitialized_driver_has_no_room() {
        let driver = FlashDriver::new(MockEeprom::blank());
        assert!(driver.layout().cell::<u8>().is_err());
    }
}
