//! PKA ring error types.

use core::fmt;

/// Result type alias for ring operations
pub type PkaResult<T> = Result<T, PkaError>;

/// Errors from ring setup, enqueue and dequeue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkaError {
    /// Malformed request; always a caller bug
    InvalidArgument(&'static str),
    /// Every command slot of the ring is occupied
    RingFull,
    /// The engine has not posted a result yet
    NoResult,
    /// `setup_rings` has not run
    NotConfigured,
    /// `setup_rings` already ran
    AlreadyConfigured,
}

impl PkaError {
    /// Expected back-pressure conditions the caller should simply retry
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RingFull | Self::NoResult)
    }
}

impl fmt::Display for PkaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {}", reason),
            Self::RingFull => write!(f, "ring full"),
            Self::NoResult => write!(f, "no result ready"),
            Self::NotConfigured => write!(f, "rings not configured"),
            Self::AlreadyConfigured => write!(f, "rings already configured"),
        }
    }
}
