//! Encoding of values held in durable cells
//!
//! Only 1, 2 and 4 byte values fit a cell; the shadow window commits in
//! units no wider than that, so a cell write is never torn.

/// A value that can live in a durable cell
pub trait NvValue: Copy {
    /// Encoded width in bytes (1, 2 or 4)
    const SIZE: usize;

    /// Little-endian encoding, `SIZE` bytes long
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    fn encode(self) -> Self::Bytes;

    fn decode(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_nv_value {
    ($($ty:ty => $size:literal),* $(,)?) => {
        $(
            impl NvValue for $ty {
                const SIZE: usize = $size;
                type Bytes = [u8; $size];

                fn encode(self) -> Self::Bytes {
                    self.to_le_bytes()
                }

                fn decode(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_nv_value! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    f32 => 4,
}

impl NvValue for bool {
    const SIZE: usize = 1;
    type Bytes = [u8; 1];

    fn encode(self) -> Self::Bytes {
        [self as u8]
    }

    fn decode(bytes: Self::Bytes) -> Self {
        bytes[0] != 0
    }
}

/// Cell values with read-modify-write arithmetic
///
/// Integers saturate at the ends of their range.
pub trait NvCounter: NvValue {
    fn step_up(self, delta: Self) -> Self;

    fn step_down(self, delta: Self) -> Self;
}

macro_rules! impl_nv_counter {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NvCounter for $ty {
                fn step_up(self, delta: Self) -> Self {
                    self.saturating_add(delta)
                }

                fn step_down(self, delta: Self) -> Self {
                    self.saturating_sub(delta)
                }
            }
        )*
    };
}

impl_nv_counter!(u8, i8, u16, i16, u32, i32);

impl NvCounter for f32 {
    fn step_up(self, delta: Self) -> Self {
        self + delta
    }

    fn step_down(self, delta: Self) -> Self {
        self - delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(<bool as NvValue>::SIZE, 1);
        assert_eq!(<i16 as NvValue>::SIZE, 2);
        assert_eq!(<f32 as NvValue>::SIZE, 4);
    }

    #[test]
    fn test_erased_bool_reads_true() {
        // Erased flash reads as all ones
        assert!(bool::decode([0xFF]));
        assert!(!bool::decode(false.encode()));
    }

    #[test]
    fn test_float_encoding() {
        let bytes = 62.5f32.encode();
        assert_eq!(f32::decode(bytes), 62.5);
    }

    #[test]
    fn test_counter_saturates() {
        assert_eq!(0xFFFFu16.step_up(1), 0xFFFF);
        assert_eq!(0u8.step_down(1), 0);
        assert_eq!(i16::MIN.step_down(5), i16::MIN);
        assert_eq!(1.5f32.step_up(1.0), 2.5);
    }
}
