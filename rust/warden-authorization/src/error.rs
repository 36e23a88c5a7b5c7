use std::fmt::{Display, Formatter};

use thiserror::Error;
use warden_compute::ComputeError;
use warden_traits::TraitSet;

use crate::{AuthorizationMethod, AuthorizationMethods};

/// Why a single channel failed to authorize a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The compute or directory service rejected a request
    #[error(transparent)]
    Compute(#[from] ComputeError),

    /// Every attempt lost a race against a concurrent metadata writer
    #[error("Metadata kept changing concurrently, gave up after {attempts} attempts")]
    ConcurrencyConflict {
        /// Attempts made before giving up
        attempts: usize,
    },

    /// Cancellation was observed at an I/O boundary
    #[error("Cancelled")]
    Cancelled,
}

impl ChannelError {
    /// Whether the error is a lost optimistic-concurrency race that a fresh
    /// attempt may win.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ChannelError::Compute(error) if error.is_conflict())
    }
}

/// A channel that was attempted and the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    /// The channel
    pub method: AuthorizationMethod,
    /// What went wrong
    pub error: ChannelError,
}

impl Display for ChannelFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.method, self.error)
    }
}

/// Errors from authorizing a key.
#[derive(Debug, Error)]
pub enum KeyAuthorizationError {
    /// An argument or setting is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// None of the requested methods can work for this instance
    #[error("None of the methods {requested} is applicable to an instance with traits {traits}")]
    NotApplicable {
        /// The methods the caller asked for
        requested: AuthorizationMethods,
        /// The instance's traits
        traits: TraitSet,
    },

    /// The instance could not be looked up
    #[error("Failed to look up instance: {0}")]
    Lookup(#[source] ComputeError),

    /// The operation was cancelled before it completed
    #[error("Key authorization was cancelled")]
    Cancelled,

    /// Every applicable channel was attempted and failed, in the order
    /// they were attempted
    #[error("Key authorization failed for all channels: {}", list_failures(.0))]
    AllChannelsFailed(Vec<ChannelFailure>),
}

fn list_failures(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(ChannelFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_lists_every_failure() {
        let error = KeyAuthorizationError::AllChannelsFailed(vec![
            ChannelFailure {
                method: AuthorizationMethod::OsLogin,
                error: ComputeError::Unavailable("directory service unavailable".into()).into(),
            },
            ChannelFailure {
                method: AuthorizationMethod::InstanceMetadata,
                error: ChannelError::ConcurrencyConflict { attempts: 3 },
            },
        ]);

        assert_eq!(
            error.to_string(),
            "Key authorization failed for all channels: \
             OsLogin: Service unavailable: directory service unavailable; \
             InstanceMetadata: Metadata kept changing concurrently, gave up after 3 attempts"
        );
    }

    #[test]
    fn it_recognizes_conflicts() {
        let conflict = ChannelError::from(ComputeError::FingerprintMismatch {
            scope: warden_compute::MetadataScope::Project("p".into()),
            expected: "v1".into(),
            actual: "v2".into(),
        });

        assert!(conflict.is_conflict());
        assert!(!ChannelError::from(ComputeError::NotFound("x".into())).is_conflict());
        assert!(!ChannelError::ConcurrencyConflict { attempts: 2 }.is_conflict());
    }
}
