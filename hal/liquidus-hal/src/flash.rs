//! EEPROM-emulation abstractions
//!
//! The oven persists every setting through a hardware EEPROM-emulation
//! block: a RAM shadow window that is mirrored into a larger region of
//! backing flash. Writing into the window starts a commit; the controller
//! reports "ready" once the data is durable.
//!
//! Chip HALs implement [`EepromController`]. Wear leveling is the block's
//! business, not ours.

/// Storage keys for records kept by flash-backed emulations
///
/// Emulations built on plain NOR flash keep their state as a couple of
/// key/value records. The keys are fixed so the layout survives firmware
/// updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Partition record written by [`FlashCommand::ProgramPartition`]
    Partition = 0,
    /// Image of the shadow window
    Shadow = 1,
}

impl StorageKey {
    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKey::Partition),
            1 => Some(StorageKey::Shadow),
            _ => None,
        }
    }
}

/// Errors reported by the flash controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Parameters rejected before any command was issued
    IllegalParams,
    /// Access error flagged by the controller
    AccessError,
    /// Write to a protected region
    ProtectionViolation,
    /// Command completed with a failure status
    CommandFailed,
    /// Read collided with a running command
    ReadCollision,
    /// Controller did not report ready in time
    Timeout,
    /// Shadow window used before the block was partitioned
    NotConfigured,
}

impl FlashError {
    /// Numeric fault code, non-zero for every error
    pub fn code(self) -> u8 {
        match self {
            FlashError::IllegalParams => 1,
            FlashError::AccessError => 2,
            FlashError::ProtectionViolation => 3,
            FlashError::CommandFailed => 4,
            FlashError::ReadCollision => 5,
            FlashError::Timeout => 6,
            FlashError::NotConfigured => 7,
        }
    }

    /// Inverse of [`FlashError::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(FlashError::IllegalParams),
            2 => Some(FlashError::AccessError),
            3 => Some(FlashError::ProtectionViolation),
            4 => Some(FlashError::CommandFailed),
            5 => Some(FlashError::ReadCollision),
            6 => Some(FlashError::Timeout),
            7 => Some(FlashError::NotConfigured),
            _ => None,
        }
    }
}

/// Size class of the shadow window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromSize {
    Bytes32,
    Bytes64,
    Bytes128,
    Bytes256,
    Bytes512,
    Kib1,
    Kib2,
    Kib4,
}

impl EepromSize {
    /// Controller encoding of the size class
    pub fn code(self) -> u8 {
        match self {
            EepromSize::Bytes32 => 0x09,
            EepromSize::Bytes64 => 0x08,
            EepromSize::Bytes128 => 0x07,
            EepromSize::Bytes256 => 0x06,
            EepromSize::Bytes512 => 0x05,
            EepromSize::Kib1 => 0x04,
            EepromSize::Kib2 => 0x03,
            EepromSize::Kib4 => 0x02,
        }
    }

    /// Window size in bytes
    pub fn bytes(self) -> usize {
        match self {
            EepromSize::Bytes32 => 32,
            EepromSize::Bytes64 => 64,
            EepromSize::Bytes128 => 128,
            EepromSize::Bytes256 => 256,
            EepromSize::Bytes512 => 512,
            EepromSize::Kib1 => 1024,
            EepromSize::Kib2 => 2048,
            EepromSize::Kib4 => 4096,
        }
    }

    /// Smallest size class holding `bytes`
    pub fn for_bytes(bytes: usize) -> Option<Self> {
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
        .find(|size| size.bytes() >= bytes)
    }
}

/// Split of the 64 KiB data flash between plain flash and EEPROM backing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartitionSplit {
    /// All data flash, no EEPROM backing
    FlashOnly,
    /// 32 KiB flash, 32 KiB backing
    Half,
    /// No data flash, 64 KiB backing
    BackingOnly,
}

impl PartitionSplit {
    /// Controller encoding of the split
    pub fn code(self) -> u8 {
        match self {
            PartitionSplit::FlashOnly => 0xFF,
            PartitionSplit::Half => 0x09,
            PartitionSplit::BackingOnly => 0x08,
        }
    }

    /// Bytes of flash set aside to back the shadow window
    pub fn backing_bytes(self) -> usize {
        match self {
            PartitionSplit::FlashOnly => 0,
            PartitionSplit::Half => 32 * 1024,
            PartitionSplit::BackingOnly => 64 * 1024,
        }
    }
}

/// Commands accepted by the flash controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashCommand {
    /// Carve out EEPROM backing and size the shadow window
    ProgramPartition {
        size: EepromSize,
        split: PartitionSplit,
    },
    /// Erase all blocks, dropping the partition
    EraseAll,
}

impl FlashCommand {
    /// Controller opcode
    pub fn opcode(&self) -> u8 {
        match self {
            FlashCommand::ProgramPartition { .. } => 0x80,
            FlashCommand::EraseAll => 0x44,
        }
    }
}

/// EEPROM-emulation controller
///
/// Methods take `&self`: the shadow window is memory mapped on real parts
/// and every durable cell in the application holds a shared handle to it.
/// Implementations provide their own interior mutability.
pub trait EepromController {
    /// Copy bytes out of the shadow window
    ///
    /// Never blocks; returns whatever the window currently holds.
    fn read(&self, offset: usize, buf: &mut [u8]);

    /// Store bytes into the shadow window, starting a commit
    ///
    /// Returns once the commit has been started. Callers wait for
    /// [`EepromController::is_ready`] to know the data is durable.
    fn write(&self, offset: usize, data: &[u8]) -> Result<(), FlashError>;

    /// True when no command or commit is in progress
    fn is_ready(&self) -> bool;

    /// True when the block has been partitioned and the window is usable
    fn is_configured(&self) -> bool;

    /// Launch a command and wait for the controller to accept it
    fn execute(&self, command: FlashCommand) -> Result<(), FlashError>;

    /// Busy-wait between readiness polls
    fn pause_ms(&self, ms: u32);
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for StorageKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match StorageKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_class_for_bytes() {
        assert_eq!(EepromSize::for_bytes(1), Some(EepromSize::Bytes32));
        assert_eq!(EepromSize::for_bytes(32), Some(EepromSize::Bytes32));
        assert_eq!(EepromSize::for_bytes(33), Some(EepromSize::Bytes64));
        assert_eq!(EepromSize::for_bytes(700), Some(EepromSize::Kib1));
        assert_eq!(EepromSize::for_bytes(4097), None);
    }

    #[test]
    fn test_size_codes() {
        assert_eq!(EepromSize::Bytes32.code(), 0x09);
        assert_eq!(EepromSize::Kib1.code(), 0x04);
        assert_eq!(EepromSize::Kib4.code(), 0x02);
        assert_eq!(PartitionSplit::Half.code(), 0x09);
        assert_eq!(PartitionSplit::BackingOnly.code(), 0x08);
        assert_eq!(PartitionSplit::FlashOnly.backing_bytes(), 0);
    }

    #[test]
    fn test_error_codes_round_trip() {
        for code in 1..=7 {
            let err = FlashError::from_code(code).unwrap();
            assert_eq!(err.code(), code);
        }
        assert_eq!(FlashError::from_code(0), None);
    }
}
