use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use warden_compute::{ComputeAdapter, MetadataScope};
use warden_traits::{InstanceTrait, TraitSet};

use super::{AuthorizationChannel, ChannelGrant, ChannelRequest};
use crate::{AuthorizationMethod, AuthorizedKeys, ChannelError, resolve_username};

/// Which metadata a [`MetadataChannel`] publishes keys in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataTarget {
    /// The target instance's own metadata
    Instance,
    /// Metadata of the project that owns the target instance
    Project,
}

/// Publishes the key in the `ssh-keys` item of instance or project
/// metadata.
///
/// Each attempt reads the item, prunes expired entries, adds or extends the
/// key and writes the result back conditioned on the fingerprint it read.
/// If the merge leaves the item unchanged, nothing is written.
#[derive(Clone)]
pub struct MetadataChannel {
    compute: Arc<dyn ComputeAdapter>,
    target: MetadataTarget,
}

impl MetadataChannel {
    /// A channel that publishes keys in instance metadata
    pub fn instance(compute: Arc<dyn ComputeAdapter>) -> Self {
        Self {
            compute,
            target: MetadataTarget::Instance,
        }
    }

    /// A channel that publishes keys in project metadata
    pub fn project(compute: Arc<dyn ComputeAdapter>) -> Self {
        Self {
            compute,
            target: MetadataTarget::Project,
        }
    }

    /// Where this channel publishes keys
    pub fn target(&self) -> MetadataTarget {
        self.target
    }

    fn scope(&self, request: &ChannelRequest<'_>) -> MetadataScope {
        match self.target {
            MetadataTarget::Instance => request.instance.scope(),
            MetadataTarget::Project => request.instance.project_scope(),
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AuthorizationChannel for MetadataChannel {
    fn method(&self) -> AuthorizationMethod {
        match self.target {
            MetadataTarget::Instance => AuthorizationMethod::InstanceMetadata,
            MetadataTarget::Project => AuthorizationMethod::ProjectMetadata,
        }
    }

    fn is_applicable(&self, traits: &TraitSet) -> bool {
        // With OS Login on, the guest ignores metadata keys altogether
        if traits.contains(InstanceTrait::os_login_enforced()) {
            return false;
        }
        match self.target {
            MetadataTarget::Instance => true,
            MetadataTarget::Project => !traits.contains(InstanceTrait::project_keys_blocked()),
        }
    }

    async fn authorize(
        &self,
        request: &ChannelRequest<'_>,
        token: &CancellationToken,
    ) -> Result<ChannelGrant, ChannelError> {
        let scope = self.scope(request);

        if token.is_cancelled() {
            return Err(ChannelError::Cancelled);
        }
        let current = self
            .compute
            .read_metadata(&scope, request.metadata_key)
            .await?;

        let original = current.value.unwrap_or_default();
        let mut keys = AuthorizedKeys::parse(&original);
        let pruned = keys.prune_expired(request.now);

        let username = resolve_username(request.preferred_username, request.account);
        let expires_at = keys.upsert(&username, request.key, request.account, request.expires_at);

        let updated = keys.to_string();
        if updated == original {
            debug!("Key is already authorized in {scope}, skipping write");
            return Ok(ChannelGrant {
                username,
                expires_at,
            });
        }

        if token.is_cancelled() {
            return Err(ChannelError::Cancelled);
        }
        let fingerprint = self
            .compute
            .write_metadata(&scope, request.metadata_key, &updated, &current.fingerprint)
            .await?;

        debug!(
            "Published key for {username} in {scope} ({} -> {fingerprint}, pruned {pruned} expired entries)",
            current.fingerprint
        );

        Ok(ChannelGrant {
            username,
            expires_at,
        })
    }
}
