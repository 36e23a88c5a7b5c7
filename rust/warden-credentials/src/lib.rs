//! SSH credentials for key authorization.
//!
//! This crate provides the key material that gets authorized on an instance:
//!
//! - [`SshPublicKey`]: an OpenSSH public key (`ssh-ed25519 AAAA...`) that can
//!   be rendered, parsed and fingerprinted
//! - [`SshKeyPair`]: a locally held key pair that exposes its public half
//! - **Ed25519** key pairs (enabled by the `ed25519` feature, on by default)

mod error;
pub use error::*;

mod public_key;
pub use public_key::*;

mod key_pair;
pub use key_pair::*;

#[cfg(feature = "ed25519")]
pub mod ed25519;
#[cfg(feature = "ed25519")]
pub use ed25519::Ed25519KeyPair;
