//! Error types for resource-ID allocation.

use core::fmt;

/// Result type alias for allocator operations
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Recoverable allocator failures.
///
/// Overlapping or double frees are not represented here: they are fatal
/// and panic inside the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// No free interval satisfies the request
    OutOfMemory,
    /// Malformed request (zero count, range past the ID space)
    InvalidArgument,
    /// Nothing left to pop
    Empty,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "no free ID range satisfies the request"),
            Self::InvalidArgument => write!(f, "invalid ID range"),
            Self::Empty => write!(f, "allocator is empty"),
        }
    }
}
