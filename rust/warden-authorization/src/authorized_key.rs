use warden_common::{DateTime, Utc};
use warden_credentials::SshPublicKey;

use crate::AuthorizationMethod;

/// A key that has been authorized on an instance, and how to use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedKeyPair {
    /// The public key that was authorized
    pub public_key: SshPublicKey,
    /// The login to present; not necessarily the one the caller asked for
    pub username: String,
    /// When the key stops being honored
    pub expires_at: DateTime<Utc>,
    /// The channel that authorized the key
    pub method: AuthorizationMethod,
}
