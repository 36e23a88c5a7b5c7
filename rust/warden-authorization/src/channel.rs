//! Authorization channels: one strategy per mechanism for getting a key
//! onto an instance.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use warden_common::{ConditionalSync, DateTime, Utc};
use warden_compute::InstanceLocator;
use warden_credentials::SshPublicKey;
use warden_traits::TraitSet;

use crate::{AuthorizationMethod, ChannelError};

mod metadata;
pub use metadata::*;

mod os_login;
pub use os_login::*;

/// Everything a channel needs for one attempt.
#[derive(Debug, Clone)]
pub struct ChannelRequest<'a> {
    /// Target instance
    pub instance: &'a InstanceLocator,
    /// Key to authorize
    pub key: &'a SshPublicKey,
    /// Login the caller would like, if any
    pub preferred_username: Option<&'a str>,
    /// E-mail of the account doing the authorizing
    pub account: &'a str,
    /// Metadata item that holds authorized keys
    pub metadata_key: &'a str,
    /// The instant the call started; entries expiring at or before it are
    /// pruned
    pub now: DateTime<Utc>,
    /// When the key should stop being honored
    pub expires_at: DateTime<Utc>,
}

/// What a channel granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGrant {
    /// The login the key was authorized for
    pub username: String,
    /// When the key stops being honored
    pub expires_at: DateTime<Utc>,
}

/// One way of authorizing a key.
///
/// A call to [`AuthorizationChannel::authorize`] is a single attempt. It
/// must not retry on its own: a lost race surfaces as an error for which
/// [`ChannelError::is_conflict`] holds, and the caller decides whether to
/// try again.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait AuthorizationChannel: ConditionalSync {
    /// The method this channel implements.
    fn method(&self) -> AuthorizationMethod;

    /// Whether the channel can work for an instance with `traits`.
    fn is_applicable(&self, traits: &TraitSet) -> bool;

    /// Make one attempt at authorizing the key.
    async fn authorize(
        &self,
        request: &ChannelRequest<'_>,
        token: &CancellationToken,
    ) -> Result<ChannelGrant, ChannelError>;
}
