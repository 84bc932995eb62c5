//! Durable storage
//!
//! Every persisted value in the oven is a [`DurableCell`] (or a
//! [`DurableArray`]) carved out of the EEPROM-emulation shadow window by
//! [`NvLayout`] at start-up. The [`FlashDriver`] owns the controller,
//! waits for commits, and latches the process-wide fault when the
//! hardware misbehaves.

mod cell;
mod driver;
mod fault;
mod layout;
mod value;

pub use cell::{DurableArray, DurableCell};
pub use driver::{FlashDriver, InitOutcome, READY_TIMEOUT_MS};
pub use fault::FaultLatch;
pub use layout::NvLayout;
pub use value::{NvCounter, NvValue};

use liquidus_hal::FlashError;

/// Errors from durable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The controller reported a failure (now latched)
    Flash(FlashError),
    /// A fault is latched; persistence is blocked until it is cleared
    Faulted(FlashError),
    /// The shadow window has no room for the request
    OutOfSpace,
    /// Array index past the end
    IndexOutOfRange,
}

impl From<FlashError> for StorageError {
    fn from(e: FlashError) -> Self {
        StorageError::Flash(e)
    }
}
