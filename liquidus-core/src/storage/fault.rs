//! Process-wide storage fault latch

use liquidus_hal::FlashError;
use portable_atomic::{AtomicU8, Ordering};

const NO_FAULT: u8 = 0;

/// Records the first flash failure until explicitly cleared
///
/// While a fault is latched, every durable write is refused. Reads keep
/// returning the shadow window.
pub struct FaultLatch {
    code: AtomicU8,
}

impl FaultLatch {
    pub const fn new() -> Self {
        Self {
            code: AtomicU8::new(NO_FAULT),
        }
    }

    /// Latch `error` unless an earlier fault is still pending
    pub fn latch(&self, error: FlashError) {
        let _ = self.code.compare_exchange(
            NO_FAULT,
            error.code(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Currently latched fault, if any
    pub fn get(&self) -> Option<FlashError> {
        FlashError::from_code(self.code.load(Ordering::Acquire))
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    /// Clear the latch, returning the fault that was pending
    pub fn clear(&self) -> Option<FlashError> {
        FlashError::from_code(self.code.swap(NO_FAULT, Ordering::AcqRel))
    }
}

impl Default for FaultLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fault_wins() {
        let latch = FaultLatch::new();
        assert_eq!(latch.get(), None);

        latch.latch(FlashError::Timeout);
        latch.latch(FlashError::AccessError);
        assert_eq!(latch.get(), Some(FlashError::Timeout));

        assert_eq!(latch.clear(), Some(FlashError::Timeout));
        assert!(!latch.is_set());
    }
}
