//! Bring-up errors.

use core::fmt;

use rbos_pka::PkaError;
use rbos_resource::ResourceError;

/// Result type alias for bring-up
pub type OffloadResult<T> = Result<T, OffloadError>;

/// Errors from [`crate::Offload::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffloadError {
    /// The configuration is inconsistent
    InvalidConfig(&'static str),
    /// An ID namespace rejected a request
    Resource(ResourceError),
    /// The PKA engine rejected a request
    Pka(PkaError),
}

impl From<ResourceError> for OffloadError {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

impl From<PkaError> for OffloadError {
    fn from(e: PkaError) -> Self {
        Self::Pka(e)
    }
}

impl fmt::Display for OffloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid offload config: {}", reason),
            Self::Resource(e) => write!(f, "resource: {}", e),
            Self::Pka(e) => write!(f, "pka: {}", e),
        }
    }
}
