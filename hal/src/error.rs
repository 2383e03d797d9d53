//! HAL error types.

use core::fmt;

/// Result type alias for HAL operations
pub type HalResult<T> = Result<T, HalError>;

/// Errors raised while describing a hardware region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Region has zero length
    ZeroSized,
    /// Base or size is not 4-byte aligned
    Misaligned {
        /// Offending value
        value: usize,
    },
    /// Access falls outside the region
    OutOfBounds {
        /// Byte offset of the access
        offset: usize,
        /// Length of the access in bytes
        len: usize,
    },
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSized => write!(f, "region has zero size"),
            Self::Misaligned { value } => write!(f, "value {:#x} is not 4-byte aligned", value),
            Self::OutOfBounds { offset, len } => {
                write!(f, "access of {} bytes at {:#x} is out of bounds", len, offset)
            },
        }
    }
}
