//! Error types for the registration and recognition workflows.

use thiserror::Error;

use crate::encoder::EncodeError;

/// Errors that can occur while registering or recognizing faces.
#[derive(Debug, Error)]
pub enum EnrollError {
    /// The batch held no usable candidate vectors.
    #[error("no usable candidate encodings ({rejected} rejected)")]
    NoCandidates { rejected: usize },

    /// None of the submitted images produced a face encoding.
    #[error("no face encodings could be extracted from {submitted} images ({failed} unreadable or without a face)")]
    NoFacesFound { submitted: usize, failed: usize },

    /// More images than one request may carry.
    #[error("{given} images submitted, at most {max} are allowed per request")]
    TooManyImages { given: usize, max: usize },

    /// The requested identity name violates the naming policy.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The encoder could not process the image.
    #[error("encoder error: {0}")]
    Encode(#[from] EncodeError),

    /// An error propagated from the identity store.
    #[error(transparent)]
    Store(#[from] visage_core::Error),

    /// An error propagated from the match engine.
    #[error(transparent)]
    Search(#[from] visage_search::SearchError),
}

impl EnrollError {
    /// Returns `true` when the caller can fix the request (bad input,
    /// duplicate name, capacity), as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::NoCandidates { .. }
            | Self::NoFacesFound { .. }
            | Self::TooManyImages { .. }
            | Self::InvalidName { .. }
            | Self::Encode(_) => true,
            Self::Store(e) => e.is_client_error(),
            Self::Search(_) => false,
        }
    }

    /// Returns `true` for a name collision with an existing identity.
    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, Self::Store(visage_core::Error::DuplicateName { .. }))
    }

    /// Returns `true` when the target identity has no room left.
    pub fn is_capacity_reached(&self) -> bool {
        matches!(self, Self::Store(visage_core::Error::CapacityReached { .. }))
    }
}

/// Convenience alias for workflow results.
pub type EnrollResult<T> = std::result::Result<T, EnrollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(EnrollError::NoCandidates { rejected: 0 }.is_client_error());
        let dup = EnrollError::from(visage_core::Error::DuplicateName {
            name: "Alice".to_string(),
        });
        assert!(dup.is_client_error());
        assert!(dup.is_duplicate_name());
        assert!(!dup.is_capacity_reached());

        let corrupt = EnrollError::from(visage_core::Error::InvalidData("bad row".to_string()));
        assert!(!corrupt.is_client_error());
    }
}
