//! Ed25519 key pairs.

use ed25519_dalek::{Signer, SigningKey};

use crate::{KeyError, SshKeyPair, SshPublicKey};

/// An Ed25519 key pair backed by `ed25519_dalek`.
#[derive(Debug, Clone)]
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new key pair with random bytes from `getrandom`.
    ///
    /// # Errors
    ///
    /// Returns an error if the RNG fails.
    pub fn generate() -> Result<Self, KeyError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).map_err(KeyError::Rng)?;
        Ok(Self::from(SigningKey::from_bytes(&seed)))
    }

    /// Import a key pair from its 32 byte seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed has the wrong length.
    pub fn import(seed: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| KeyError::InvalidSeedLength(seed.len()))?;
        Ok(Self::from(SigningKey::from_bytes(&seed)))
    }

    /// Export the seed bytes.
    #[must_use]
    pub fn export(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The `ed25519_dalek` verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl From<SigningKey> for Ed25519KeyPair {
    fn from(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }
}

impl SshKeyPair for Ed25519KeyPair {
    fn public_key(&self) -> SshPublicKey {
        SshPublicKey::ed25519(&self.verifying_key().to_bytes())
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SshKeyAlgorithm;
    use ed25519_dalek::{Signature, Verifier};
    use testresult::TestResult;

    #[test]
    fn it_generates_distinct_keys() -> TestResult {
        let first = Ed25519KeyPair::generate()?;
        let second = Ed25519KeyPair::generate()?;

        assert_ne!(first.public_key(), second.public_key());
        assert_eq!(first.public_key().algorithm(), SshKeyAlgorithm::Ed25519);
        Ok(())
    }

    #[test]
    fn it_imports_and_exports_seeds() -> TestResult {
        let original = Ed25519KeyPair::import(&[42; 32])?;
        let restored = Ed25519KeyPair::import(&original.export())?;

        assert_eq!(original.public_key(), restored.public_key());
        Ok(())
    }

    #[test]
    fn it_rejects_short_seeds() {
        assert!(matches!(
            Ed25519KeyPair::import(&[1; 16]),
            Err(KeyError::InvalidSeedLength(16))
        ));
    }

    #[test]
    fn it_signs_verifiably() -> TestResult {
        let key_pair = Ed25519KeyPair::import(&[9; 32])?;
        let signature = key_pair.sign(b"session-id");
        let signature = Signature::from_slice(&signature)?;

        key_pair
            .verifying_key()
            .verify(b"session-id", &signature)?;
        Ok(())
    }

    #[test]
    fn it_exposes_an_openssh_public_key() -> TestResult {
        let key_pair = Ed25519KeyPair::import(&[9; 32])?;
        let rendered = key_pair.public_key().to_string();
        let parsed: SshPublicKey = rendered.parse()?;

        assert_eq!(parsed, key_pair.public_key());
        Ok(())
    }
}
