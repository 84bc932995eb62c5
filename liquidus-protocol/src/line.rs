//! Line assembly
//!
//! Collects bytes from the transport until a `\n`. Carriage returns are
//! dropped wherever they appear, so `\r\n`, `\n\r` and bare `\n` endings
//! all work.

use heapless::{String, Vec};

/// Longest accepted line, excluding the terminator
pub const MAX_LINE: usize = 120;

/// Errors from line assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded [`MAX_LINE`]; the rest of it is discarded
    LineTooLong,
    /// Line is not valid UTF-8
    InvalidUtf8,
}

/// Byte-at-a-time line assembler
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    buffer: Vec<u8, MAX_LINE>,
    overflowed: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }

    /// Feed one byte
    ///
    /// Returns `Ok(Some(line))` at the end of a line, `Ok(None)` while more
    /// bytes are needed. An overlong line is reported once, at its end.
    pub fn push(&mut self, byte: u8) -> Result<Option<String<MAX_LINE>>, LineError> {
        match byte {
            b'\r' => Ok(None),
            b'\n' => {
                let overflowed = self.overflowed;
                let bytes = core::mem::take(&mut self.buffer);
                self.overflowed = false;
                if overflowed {
                    return Err(LineError::LineTooLong);
                }
                String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|_| LineError::InvalidUtf8)
            }
            _ => {
                if !self.overflowed && self.buffer.push(byte).is_err() {
                    self.overflowed = true;
                    self.buffer.clear();
                }
                Ok(None)
            }
        }
    }

    /// Feed bytes until the first complete line
    ///
    /// Returns the line and how many bytes were consumed.
    pub fn push_bytes(
        &mut self,
        bytes: &[u8],
    ) -> (Result<Option<String<MAX_LINE>>, LineError>, usize) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.push(byte) {
                Ok(None) => {}
                other => return (other, i + 1),
            }
        }
        (Ok(None), bytes.len())
    }
}
