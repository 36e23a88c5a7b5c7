//! OpenSSH public keys.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::KeyError;

/// Public key algorithms accepted in authorized-keys entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SshKeyAlgorithm {
    /// `ssh-ed25519`
    Ed25519,
    /// `ssh-rsa`
    Rsa,
    /// `ecdsa-sha2-nistp256`
    EcdsaNistp256,
    /// `ecdsa-sha2-nistp384`
    EcdsaNistp384,
    /// `ecdsa-sha2-nistp521`
    EcdsaNistp521,
}

impl SshKeyAlgorithm {
    /// The algorithm name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SshKeyAlgorithm::Ed25519 => "ssh-ed25519",
            SshKeyAlgorithm::Rsa => "ssh-rsa",
            SshKeyAlgorithm::EcdsaNistp256 => "ecdsa-sha2-nistp256",
            SshKeyAlgorithm::EcdsaNistp384 => "ecdsa-sha2-nistp384",
            SshKeyAlgorithm::EcdsaNistp521 => "ecdsa-sha2-nistp521",
        }
    }
}

impl FromStr for SshKeyAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssh-ed25519" => Ok(SshKeyAlgorithm::Ed25519),
            "ssh-rsa" => Ok(SshKeyAlgorithm::Rsa),
            "ecdsa-sha2-nistp256" => Ok(SshKeyAlgorithm::EcdsaNistp256),
            "ecdsa-sha2-nistp384" => Ok(SshKeyAlgorithm::EcdsaNistp384),
            "ecdsa-sha2-nistp521" => Ok(SshKeyAlgorithm::EcdsaNistp521),
            other => Err(KeyError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl Display for SshKeyAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An SSH public key: the algorithm plus the key blob in SSH wire format.
///
/// Two keys are equal when their algorithm and blob are bit-for-bit equal.
/// The textual form is `<algorithm> <base64 blob>`; a trailing comment is
/// accepted when parsing and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SshPublicKey {
    algorithm: SshKeyAlgorithm,
    blob: Vec<u8>,
}

impl SshPublicKey {
    /// Build a key from a wire-format blob, checking that the blob starts
    /// with the algorithm name.
    pub fn from_blob(blob: Vec<u8>) -> Result<Self, KeyError> {
        let (name, _) = read_string(&blob)
            .ok_or_else(|| KeyError::MalformedPublicKey("truncated key blob".into()))?;
        let name = std::str::from_utf8(name)
            .map_err(|_| KeyError::MalformedPublicKey("algorithm is not UTF-8".into()))?;
        let algorithm = name.parse()?;

        Ok(Self { algorithm, blob })
    }

    /// Build an `ssh-ed25519` key from raw public key bytes.
    pub fn ed25519(public_key: &[u8; 32]) -> Self {
        let mut blob = Vec::with_capacity(51);
        write_string(&mut blob, SshKeyAlgorithm::Ed25519.as_str().as_bytes());
        write_string(&mut blob, public_key);
        Self {
            algorithm: SshKeyAlgorithm::Ed25519,
            blob,
        }
    }

    /// The key algorithm.
    pub fn algorithm(&self) -> SshKeyAlgorithm {
        self.algorithm
    }

    /// The key blob in SSH wire format.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Base64 encoding of the blob, as used in authorized-keys lines.
    pub fn encoded_blob(&self) -> String {
        STANDARD.encode(&self.blob)
    }

    /// `SHA256:<base64>` fingerprint, as printed by `ssh-keygen -l`.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.blob);
        format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))
    }
}

impl Display for SshPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.algorithm, self.encoded_blob())
    }
}

impl FromStr for SshPublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let declared = tokens
            .next()
            .ok_or_else(|| KeyError::MalformedPublicKey("missing algorithm".into()))?;
        let encoded = tokens
            .next()
            .ok_or_else(|| KeyError::MalformedPublicKey("missing key data".into()))?;

        let declared_algorithm: SshKeyAlgorithm = declared.parse()?;
        let blob = STANDARD
            .decode(encoded)
            .map_err(|error| KeyError::MalformedPublicKey(format!("{error}")))?;
        let key = SshPublicKey::from_blob(blob)?;

        if key.algorithm != declared_algorithm {
            return Err(KeyError::AlgorithmMismatch {
                declared: declared.to_string(),
                encoded: key.algorithm.to_string(),
            });
        }

        if key.algorithm == SshKeyAlgorithm::Ed25519 && key.blob.len() != 51 {
            return Err(KeyError::MalformedPublicKey(format!(
                "ed25519 key blob must be 51 bytes, got {}",
                key.blob.len()
            )));
        }

        Ok(key)
    }
}

impl From<SshPublicKey> for String {
    fn from(value: SshPublicKey) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for SshPublicKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn write_string(buffer: &mut Vec<u8>, value: &[u8]) {
    buffer.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buffer.extend_from_slice(value);
}

fn read_string(buffer: &[u8]) -> Option<(&[u8], &[u8])> {
    let (length, rest) = buffer.split_first_chunk::<4>()?;
    let length = u32::from_be_bytes(*length) as usize;
    if rest.len() < length {
        return None;
    }
    Some(rest.split_at(length))
}
