//! Error types for key operations.

use thiserror::Error;

/// Errors from creating, importing or parsing keys.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The seed bytes have the wrong length (expected 32).
    #[error("Expected 32 seed bytes, got {0}")]
    InvalidSeedLength(usize),

    /// Random number generation failed.
    #[cfg(feature = "ed25519")]
    #[error("RNG error: {0}")]
    Rng(getrandom::Error),

    /// The public key text is not in `<algorithm> <base64> [comment]` form.
    #[error("Malformed public key: {0}")]
    MalformedPublicKey(String),

    /// The key algorithm is not one we know how to handle.
    #[error("Unsupported key algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// The algorithm named in the text differs from the one encoded in the
    /// key blob.
    #[error("Key declares algorithm '{declared}' but encodes '{encoded}'")]
    AlgorithmMismatch {
        /// Algorithm named in the text.
        declared: String,
        /// Algorithm found inside the blob.
        encoded: String,
    },
}
