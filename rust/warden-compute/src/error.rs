use thiserror::Error;

use crate::{Fingerprint, MetadataScope};

/// Errors reported by a [`crate::ComputeAdapter`] or [`crate::DirectoryService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    /// A conditional write was based on a stale fingerprint
    #[error("Metadata of {scope} changed concurrently: expected {expected}, got {actual}")]
    FingerprintMismatch {
        /// Scope the write targeted
        scope: MetadataScope,
        /// Fingerprint the write was based on
        expected: Fingerprint,
        /// Fingerprint the scope has now
        actual: Fingerprint,
    },

    /// The caller lacks permission for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The instance or project does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service could not be reached or failed internally
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A request or response could not be interpreted
    #[error("Malformed data: {0}")]
    Malformed(String),
}

impl ComputeError {
    /// Whether the error is a lost optimistic-concurrency race, which is
    /// worth retrying after a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ComputeError::FingerprintMismatch { .. })
    }
}
