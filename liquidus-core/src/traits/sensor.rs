//! Thermocouple converter trait

/// One cold-junction-compensating thermocouple converter
///
/// Implementations perform a single read transaction and hand back the
/// raw 32-bit frame, most significant byte first. Decoding happens in
/// [`crate::sensor`].
pub trait ThermocoupleProbe {
    /// Error type for the bus transaction
    type Error;

    /// Read one raw frame
    fn read_frame(&mut self) -> Result<[u8; 4], Self::Error>;
}
