use warden_common::ConditionalSync;

use crate::SshPublicKey;

/// A locally held SSH key pair.
///
/// Only the public half ever leaves the process; it is what gets authorized
/// on an instance. The private half signs the SSH session handshake.
pub trait SshKeyPair: ConditionalSync {
    /// The public half, in OpenSSH form.
    fn public_key(&self) -> SshPublicKey;

    /// Sign `message` with the private half, returning the raw signature.
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}
