//! Durable cells and arrays
//!
//! A cell is a typed view onto a slot of the shadow window. Reads come
//! straight from the window; writes block until the controller has
//! committed them.

use core::marker::PhantomData;
use liquidus_hal::EepromController;

use super::driver::FlashDriver;
use super::value::{NvCounter, NvValue};
use super::StorageError;

/// A single persisted value
///
/// Cells are created once by [`NvLayout`](super::NvLayout) and owned by
/// the subsystem that declared them. They are deliberately not `Clone`:
/// one owner means one writer.
pub struct DurableCell<'a, T, C> {
    driver: &'a FlashDriver<C>,
    offset: usize,
    _value: PhantomData<T>,
}

impl<'a, T: NvValue, C: EepromController> DurableCell<'a, T, C> {
    pub(crate) fn new(driver: &'a FlashDriver<C>, offset: usize) -> Self {
        Self {
            driver,
            offset,
            _value: PhantomData,
        }
    }

    /// Last committed value
    pub fn read(&self) -> T {
        let mut bytes = T::Bytes::default();
        self.driver.load(self.offset, bytes.as_mut());
        T::decode(bytes)
    }

    /// Store `value` and block until it is durable
    pub fn write(&mut self, value: T) -> Result<(), StorageError> {
        self.driver.store(self.offset, value.encode().as_ref())
    }

    /// Offset of this cell in the shadow window
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a, T, C> DurableCell<'a, T, C>
where
    T: NvCounter,
    C: EepromController,
{
    /// Read-modify-write increment, saturating for integers
    pub fn add(&mut self, delta: T) -> Result<(), StorageError> {
        let value = self.read().step_up(delta);
        self.write(value)
    }

    /// Read-modify-write decrement, saturating for integers
    pub fn sub(&mut self, delta: T) -> Result<(), StorageError> {
        let value = self.read().step_down(delta);
        self.write(value)
    }
}

/// A fixed-length array of persisted values
///
/// Elements commit one at a time. A failure part way through leaves the
/// earlier elements written: array updates are not atomic.
pub struct DurableArray<'a, T, C, const N: usize> {
    driver: &'a FlashDriver<C>,
    offset: usize,
    _value: PhantomData<T>,
}

impl<'a, T: NvValue, C: EepromController, const N: usize> DurableArray<'a, T, C, N> {
    pub(crate) fn new(driver: &'a FlashDriver<C>, offset: usize) -> Self {
        Self {
            driver,
            offset,
            _value: PhantomData,
        }
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Element at `index`, or `None` past the end
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= N {
            return None;
        }
        let mut bytes = T::Bytes::default();
        self.driver.load(self.element_offset(index), bytes.as_mut());
        Some(T::decode(bytes))
    }

    /// Store one element
    pub fn set(&mut self, index: usize, value: T) -> Result<(), StorageError> {
        if index >= N {
            return Err(StorageError::IndexOutOfRange);
        }
        self.driver
            .store(self.element_offset(index), value.encode().as_ref())
    }

    /// Store `value` into every element
    pub fn set_all(&mut self, value: T) -> Result<(), StorageError> {
        for index in 0..N {
            self.set(index, value)?;
        }
        Ok(())
    }

    /// Store a whole array, element by element
    pub fn write_all(&mut self, values: &[T; N]) -> Result<(), StorageError> {
        for (index, value) in values.iter().enumerate() {
            self.set(index, *value)?;
        }
        Ok(())
    }

    /// Snapshot of all elements
    pub fn to_array(&self) -> [T; N] {
        core::array::from_fn(|index| {
            let mut bytes = T::Bytes::default();
            self.driver.load(self.element_offset(index), bytes.as_mut());
            T::decode(bytes)
        })
    }

    fn element_offset(&self, index: usize) -> usize {
        self.offset + index * T::SIZE
    }
}
